use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};
use graphaura_core::GraphSnapshot;
use std::time::Duration;

use crate::graph::filter::VisibleCache;
use crate::graph::store::GraphStore;
use crate::net::uds::fetch_snapshot;
use crate::render::RenderMode;
use crate::util::cache::{cache_file_path, fallback_snapshot};
use crate::util::config;

pub fn summary_lines(graph: &GraphSnapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "{} memories, {} relationships",
        graph.nodes.len(),
        graph.links.len()
    )];
    for (t, count) in graph.count_by_type() {
        lines.push(format!("  {}: {count}", t.as_str()));
    }
    lines
}

/// Text summary drawn instead of the 3D scene once rendering has failed.
pub fn fallback_panel(
    mut contexts: EguiContexts,
    mode: Res<RenderMode>,
    store: Res<GraphStore>,
    cache: Res<VisibleCache>,
) {
    let RenderMode::Fallback { reason } = &*mode else {
        return;
    };
    egui::CentralPanel::default().show(contexts.ctx_mut(), |ui| {
        ui.heading("3D view unavailable");
        ui.label(reason);
        ui.separator();
        for line in summary_lines(store.graph()) {
            ui.monospace(line);
        }
        let visible = cache.current();
        ui.monospace(format!(
            "visible: {} memories, {} relationships",
            visible.nodes.len(),
            visible.links.len()
        ));
        if let Some(err) = &store.view().error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::LIGHT_RED, err);
        }
    });
}

/// Runs without a window: fetch the graph the same way the app would and
/// print its summary.
pub fn run_headless(reason: &str) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    tracing::warn!(%reason, "3D rendering unavailable, printing a text summary");

    let cfg = config::load_or_default();
    let (snapshot, source) = match fetch_snapshot(&cfg.sock_path(), Duration::from_secs(2)) {
        Ok(snap) => (snap, "agent"),
        Err(e) => {
            tracing::info!(error = %format!("{e:#}"), "agent unavailable");
            let cache = cfg.cache_enabled.then(cache_file_path).flatten();
            fallback_snapshot(cache.as_deref())
        }
    };
    let (snapshot, issues) = snapshot.sanitized();
    for issue in &issues {
        tracing::warn!(%issue, "dropping inconsistent graph data");
    }

    println!("graphaura: 3D view unavailable ({reason})");
    println!("data source: {source}");
    for line in summary_lines(&snapshot) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphaura_core::demo::demo_snapshot;

    #[test]
    fn demo_summary_counts_everything() {
        let lines = summary_lines(&demo_snapshot());
        assert_eq!(lines[0], "33 memories, 37 relationships");
        assert!(lines.iter().any(|l| l.trim() == "event: 11"));
    }

    #[test]
    fn empty_graph_summary() {
        assert_eq!(
            summary_lines(&GraphSnapshot::default()),
            vec!["0 memories, 0 relationships".to_string()]
        );
    }
}
