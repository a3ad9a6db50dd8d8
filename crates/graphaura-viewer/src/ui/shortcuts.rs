use bevy::prelude::{EventWriter, ResMut};
use bevy_egui::{egui, EguiContexts};

use crate::app::events::{FocusNode, StartTour};
use crate::graph::highlight::hover_leave;
use crate::graph::store::GraphStore;
use crate::ui::UiState;

pub fn handle_shortcuts(
    mut contexts: EguiContexts,
    mut store: ResMut<GraphStore>,
    mut ui_state: ResMut<UiState>,
    mut tour: EventWriter<StartTour>,
    mut focus: EventWriter<FocusNode>,
) {
    let ctx = contexts.ctx_mut();
    let wants_keyboard = ctx.wants_keyboard_input();

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        ui_state.help_open = false;
        if store.view().selected.is_some() {
            store.set_selected_node(None);
        }
        hover_leave(&mut store);
    }
    if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::F)) {
        ui_state.focus_search = true;
        return;
    }

    if wants_keyboard {
        return;
    }

    if ctx.input(|i| i.events.iter().any(|e| matches!(e, egui::Event::Text(t) if t == "?"))) {
        ui_state.help_open = !ui_state.help_open;
    }
    if ctx.input(|i| i.key_pressed(egui::Key::T)) {
        tour.send(StartTour);
    }
    if ctx.input(|i| i.key_pressed(egui::Key::F) && i.modifiers.is_none()) {
        if let Some(id) = store.view().selected.clone() {
            focus.send(FocusNode::plain(id));
        }
    }
}
