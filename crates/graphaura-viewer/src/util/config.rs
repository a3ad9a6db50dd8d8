use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::layout::LayoutParams;
use crate::graph::tour::{TourSettings, MAX_STOPS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Overrides the agent socket location.
    pub socket_path: Option<String>,
    pub cache_enabled: bool,
    pub node_size: f32,
    pub focus_distance: f32,
    pub focus_duration_ms: u64,
    pub bloom_intensity: f32,
    pub show_labels: bool,
    pub layout_force: bool,
    pub link_distance: f32,
    pub repulsion: f32,
    pub damping: f32,
    pub max_step: f32,
    pub tour_max_stops: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let layout = LayoutParams::default();
        Self {
            socket_path: None,
            cache_enabled: true,
            node_size: 0.4,
            focus_distance: 12.0,
            focus_duration_ms: 1500,
            bloom_intensity: 0.3,
            show_labels: true,
            layout_force: layout.enabled,
            link_distance: layout.link_distance,
            repulsion: layout.repulsion,
            damping: layout.damping,
            max_step: layout.max_step,
            tour_max_stops: MAX_STOPS,
        }
    }
}

impl ViewerConfig {
    pub fn sock_path(&self) -> String {
        if let Some(path) = self.socket_path.as_ref().filter(|p| !p.trim().is_empty()) {
            return path.clone();
        }
        if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
            format!("{dir}/graphaura.sock")
        } else {
            "/tmp/graphaura.sock".to_string()
        }
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            enabled: self.layout_force,
            link_distance: self.link_distance,
            repulsion: self.repulsion,
            damping: self.damping,
            max_step: self.max_step,
            ..LayoutParams::default()
        }
    }

    pub fn tour_settings(&self) -> TourSettings {
        TourSettings {
            max_stops: self.tour_max_stops.clamp(1, MAX_STOPS),
            ..TourSettings::default()
        }
    }

    pub fn focus_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.focus_duration_ms)
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "graphaura")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring malformed viewer config");
        ViewerConfig::default()
    })
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        let cfg = ViewerConfig {
            socket_path: Some("/run/user/1000/custom.sock".into()),
            show_labels: false,
            tour_max_stops: 8,
            ..ViewerConfig::default()
        };

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "node_size = 0.8\n").expect("write");

        let loaded = load_or_default_from_path(&path);
        assert_eq!(loaded.node_size, 0.8);
        assert_eq!(loaded.focus_duration_ms, 1500);
        assert!(loaded.cache_enabled);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "node_size = \"huge\"").expect("write");
        assert_eq!(load_or_default_from_path(&path), ViewerConfig::default());
    }

    #[test]
    fn socket_override_wins() {
        let cfg = ViewerConfig {
            socket_path: Some("/tmp/elsewhere.sock".into()),
            ..ViewerConfig::default()
        };
        assert_eq!(cfg.sock_path(), "/tmp/elsewhere.sock");
        assert!(ViewerConfig::default().sock_path().ends_with("graphaura.sock"));
    }

    #[test]
    fn tour_stops_are_clamped() {
        let cfg = ViewerConfig {
            tour_max_stops: 99,
            ..ViewerConfig::default()
        };
        assert_eq!(cfg.tour_settings().max_stops, MAX_STOPS);
    }
}
