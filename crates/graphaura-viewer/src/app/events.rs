use bevy::prelude::{Event, Vec3};
use graphaura_core::NodeId;
use std::time::Duration;

#[derive(Event, Debug, Clone)]
pub struct Picked(pub NodeId);

#[derive(Event, Debug, Clone, Copy)]
pub struct ClickedEmpty;

#[derive(Event, Debug, Clone, Copy)]
pub struct StartTour;

/// Fly the camera to a node. `jitter` is added to the computed camera spot.
#[derive(Event, Debug, Clone)]
pub struct FocusNode {
    pub id: NodeId,
    pub jitter: Vec3,
    pub duration: Option<Duration>,
}

impl FocusNode {
    pub fn plain(id: NodeId) -> Self {
        Self {
            id,
            jitter: Vec3::ZERO,
            duration: None,
        }
    }
}
