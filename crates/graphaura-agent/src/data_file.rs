use anyhow::{Context, Result};
use graphaura_core::demo::demo_snapshot;
use graphaura_core::{Extraction, GraphSnapshot};
use std::fs;
use std::path::Path;

/// Reads the graph file. A missing file, or no file at all, starts from the
/// demo snapshot; a file that exists but does not parse is an error.
/// Repeated links between the same pair keep their first occurrence.
pub fn load_or_demo(path: Option<&Path>) -> Result<GraphSnapshot> {
    let Some(path) = path else {
        return Ok(demo_snapshot());
    };
    if !path.exists() {
        tracing::info!(path = %path.display(), "data file not found, starting from the demo graph");
        return Ok(demo_snapshot());
    }
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let stored: GraphSnapshot =
        serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))?;
    let (clean, issues) = GraphSnapshot::from_traversal(stored.nodes, stored.links).sanitized();
    for issue in &issues {
        tracing::warn!(%issue, "dropping inconsistent graph data");
    }
    Ok(clean)
}

pub fn save(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(snapshot).context("serialize graph")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

pub fn load_extraction(path: &Path) -> Result<Extraction> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse extraction {}", path.display()))
}
