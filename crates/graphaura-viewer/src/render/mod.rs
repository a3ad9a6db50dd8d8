pub mod camera;
pub mod capability;
pub mod fallback;
pub mod picking;
pub mod scene;
pub mod spatial;

use bevy::prelude::{Res, Resource};
use std::sync::Arc;

use scene::SceneDescription;

pub use camera::{fly_camera, focus_camera, orbit_camera, run_tour, setup_scene, start_tour};
pub use fallback::fallback_panel;
pub use picking::{apply_picks, hover_detection, pick_on_click};
pub use spatial::{
    configure_gizmos, draw_labels, draw_links, rebuild_scene, sync_transforms, HighlightGizmos,
};

/// Chosen once at start-up and switched to `Fallback` at most once after
/// that. There is no way back within a session.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Scene,
    Fallback {
        reason: String,
    },
}

/// Last scene handed to the ECS.
#[derive(Resource, Default)]
pub struct CurrentScene(pub Arc<SceneDescription>);

pub fn scene_active(mode: Res<RenderMode>) -> bool {
    *mode == RenderMode::Scene
}
