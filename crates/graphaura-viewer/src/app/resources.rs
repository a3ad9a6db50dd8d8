use bevy::prelude::Resource;
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::net::Incoming;
use crate::util::config::ViewerConfig;

#[derive(Resource)]
pub struct NetRx(pub Receiver<Incoming>);

#[derive(Resource, Debug, Clone)]
pub struct ViewerSettings(pub ViewerConfig);

/// Where the current graph came from and whether the agent is reachable.
#[derive(Resource, Debug, Default)]
pub struct NetStatus {
    pub connected: bool,
    pub snapshot_received: bool,
    pub fallback_source: Option<&'static str>,
    pub cache_path: Option<PathBuf>,
}

/// Raised by the store subscriber whenever the scene has to be rebuilt.
#[derive(Resource, Clone)]
pub struct SceneFlags {
    needs_redraw: Arc<AtomicBool>,
}

impl Default for SceneFlags {
    fn default() -> Self {
        Self {
            needs_redraw: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SceneFlags {
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.needs_redraw)
    }

    pub fn request_redraw(&self) {
        self.needs_redraw.store(true, Ordering::Relaxed);
    }

    pub fn take_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::Relaxed)
    }
}
