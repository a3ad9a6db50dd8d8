pub mod help;
pub mod hud;
pub mod panel;
pub mod shortcuts;
pub mod tooltips;

use bevy::prelude::Resource;
use graphaura_core::NodeId;

use crate::graph::edits::NewMemory;

pub use help::help_overlay;
pub use hud::hud_overlay;
pub use panel::ui_panel;
pub use shortcuts::handle_shortcuts;
pub use tooltips::hover_tooltip;

pub const PANEL_W: f32 = 300.0;

#[derive(Resource, Debug, Default)]
pub struct UiState {
    pub form: NewMemory,
    pub link_to_selected: bool,
    pub help_open: bool,
    /// Set by Ctrl+F, consumed by the search box on the next frame.
    pub focus_search: bool,
    pub connect_target: Option<NodeId>,
    pub connect_relationship: String,
}
