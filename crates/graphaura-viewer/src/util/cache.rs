use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use directories::ProjectDirs;
use graphaura_core::demo::demo_snapshot;
use graphaura_core::GraphSnapshot;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::graph::store::{SnapshotOrigin, SnapshotSink};

pub fn cache_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "graphaura")?;
    Some(proj.data_dir().join("graph_cache.json"))
}

pub fn load_cached(path: &Path) -> anyhow::Result<GraphSnapshot> {
    let data = fs::read(path).with_context(|| format!("failed to read cache {}", path.display()))?;
    serde_json::from_slice(&data)
        .with_context(|| format!("failed to decode cache {}", path.display()))
}

pub fn write_snapshot(path: &Path, snapshot: &GraphSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
    }
    let data = serde_json::to_vec(snapshot).context("failed to serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move cache into place at {}", path.display()))?;
    Ok(())
}

/// Snapshot to run on when the agent cannot provide one: the local cache if
/// it is readable and non-empty, otherwise the built-in demo graph.
pub fn fallback_snapshot(path: Option<&Path>) -> (GraphSnapshot, &'static str) {
    if let Some(path) = path {
        match load_cached(path) {
            Ok(snap) if !snap.nodes.is_empty() => return (snap, "cache"),
            Ok(_) => tracing::debug!(path = %path.display(), "cache is empty"),
            Err(e) => tracing::debug!(error = %format!("{e:#}"), "no usable cache"),
        }
    }
    (demo_snapshot(), "demo")
}

/// Writes snapshots on a background thread. Only the newest pending snapshot
/// is written when several queue up.
pub struct CacheWriter {
    tx: Sender<Arc<GraphSnapshot>>,
}

impl CacheWriter {
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::spawn(move || run_writer(path, rx));
        Self { tx }
    }
}

fn run_writer(path: PathBuf, rx: Receiver<Arc<GraphSnapshot>>) {
    while let Ok(mut snap) = rx.recv() {
        for newer in rx.try_iter() {
            snap = newer;
        }
        match write_snapshot(&path, &snap) {
            Ok(()) => tracing::debug!(path = %path.display(), nodes = snap.nodes.len(), "cache written"),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "cache write failed"),
        }
    }
}

impl SnapshotSink for CacheWriter {
    fn save(&self, snapshot: Arc<GraphSnapshot>, _origin: SnapshotOrigin) {
        if self.tx.send(snapshot).is_err() {
            tracing::warn!("cache writer is gone, snapshot not cached");
        }
    }
}
