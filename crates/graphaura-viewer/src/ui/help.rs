use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};

use crate::ui::UiState;

pub fn help_overlay(mut contexts: EguiContexts, ui_state: Res<UiState>) {
    if !ui_state.help_open {
        return;
    }

    egui::Window::new("Shortcuts")
        .collapsible(false)
        .resizable(false)
        .show(contexts.ctx_mut(), |ui| {
            ui.label("Ctrl+F: search");
            ui.label("Esc: clear selection and hover");
            ui.label("F: fly to the selected memory");
            ui.label("T: play the guided tour");
            ui.label("Right drag: orbit, wheel: zoom");
            ui.label("?: toggle this help");
        });
}
