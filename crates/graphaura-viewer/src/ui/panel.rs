use bevy::prelude::{EventWriter, Res, ResMut};
use bevy_egui::{egui, EguiContexts};
use graphaura_core::{NodeId, NodeType};

use crate::app::events::{FocusNode, StartTour};
use crate::app::resources::{NetStatus, SceneFlags, ViewerSettings};
use crate::graph::edits::{self, NewMemory};
use crate::graph::store::GraphStore;
use crate::graph::tour::GuidedTour;
use crate::net::AgentLink;
use crate::ui::{UiState, PANEL_W};
use crate::util::config::{self, ViewerConfig};
use crate::util::ids::is_local_id;

fn display_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn ui_panel(
    mut contexts: EguiContexts,
    mut store: ResMut<GraphStore>,
    mut ui_state: ResMut<UiState>,
    agent: Option<Res<AgentLink>>,
    status: Res<NetStatus>,
    tour: Res<GuidedTour>,
    mut start_tour: EventWriter<StartTour>,
    mut focus: EventWriter<FocusNode>,
    mut settings: ResMut<ViewerSettings>,
    flags: Res<SceneFlags>,
) {
    let agent = agent.as_deref();
    egui::SidePanel::left("left")
        .default_width(PANEL_W)
        .show(contexts.ctx_mut(), |ui| {
            ui.heading("GraphAura");
            ui.label(format!("memories: {}", store.graph().nodes.len()));
            ui.label(format!("relationships: {}", store.graph().links.len()));
            match (status.connected, status.fallback_source) {
                (true, _) => ui.label("agent: connected"),
                (false, Some(source)) => ui.label(format!("agent: offline ({source} data)")),
                (false, None) => ui.label("agent: connecting"),
            };

            if store.view().is_loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading memories");
                });
            }
            if let Some(err) = store.view().error.clone() {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                    if ui.small_button("x").on_hover_text("Dismiss").clicked() {
                        store.set_error(None);
                    }
                });
            }
            ui.separator();

            filter_controls(ui, &mut store, &mut ui_state);
            ui.separator();

            ui.horizontal(|ui| {
                let play = egui::Button::new("Play tour");
                if ui.add_enabled(!tour.is_running(), play).clicked() {
                    start_tour.send(StartTour);
                }
                if let Some((stop, total)) = tour.progress() {
                    ui.label(format!("stop {stop}/{total}"));
                }
            });
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                selected_details(ui, &mut store, agent, &mut ui_state, &mut focus);
                ui.separator();
                add_memory_form(ui, &mut store, agent, &mut ui_state);
                ui.separator();
                settings_section(ui, &mut settings.0, &flags);
                ui.separator();
                if ui.button("Clear graph").clicked() {
                    store.clear_graph();
                }
            });
        });
}

fn filter_controls(ui: &mut egui::Ui, store: &mut GraphStore, ui_state: &mut UiState) {
    let current = store.view().filter_by_type;
    let mut choice = current;
    egui::ComboBox::from_label("Type")
        .selected_text(current.map_or("all", |t| t.as_str()))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut choice, None, "all");
            for t in NodeType::ALL {
                ui.selectable_value(&mut choice, Some(t), t.as_str());
            }
        });
    if choice != current {
        store.set_filter_by_type(choice);
    }

    ui.add_space(4.0);
    let mut query = store.view().search_query.clone();
    let resp = ui.add(egui::TextEdit::singleline(&mut query).hint_text("Search (Ctrl+F)"));
    if ui_state.focus_search {
        resp.request_focus();
        ui_state.focus_search = false;
    }
    if resp.changed() {
        store.set_search_query(query);
    }
}

fn selected_details(
    ui: &mut egui::Ui,
    store: &mut GraphStore,
    agent: Option<&AgentLink>,
    ui_state: &mut UiState,
    focus: &mut EventWriter<FocusNode>,
) {
    let Some(id) = store.view().selected.clone() else {
        ui.label("Click a memory to see its details.");
        return;
    };
    let Some(node) = store.node(&id).cloned() else {
        return;
    };

    ui.heading(&node.name);
    ui.label(format!("type: {}", node.node_type.as_str()));
    ui.label(format!("weight: {:.1}", node.weight));
    if is_local_id(id.as_str()) && !node.metadata.contains_key("persisted") {
        ui.weak("not saved by the agent yet");
    }
    if let Some(desc) = node.description() {
        ui.label(desc);
    }

    let relations: Vec<(NodeId, String, String)> = store
        .links_of(&id)
        .filter_map(|l| {
            let other = l.other_end(&id)?.clone();
            let name = store
                .node(&other)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| other.to_string());
            Some((other, l.relationship.clone(), name))
        })
        .collect();

    ui.add_space(6.0);
    ui.label(format!("relationships ({})", relations.len()));
    let mut unlink = None;
    for (other, rel, name) in relations.iter() {
        ui.horizontal(|ui| {
            ui.label(format!("{rel} -> {name}"));
            if ui.small_button("x").on_hover_text("Remove relationship").clicked() {
                unlink = Some(other.clone());
            }
        });
    }
    if let Some(other) = unlink {
        edits::disconnect(store, agent, &id, &other);
    }

    let extra: Vec<_> = node
        .metadata
        .iter()
        .filter(|(k, _)| k.as_str() != "description")
        .collect();
    if !extra.is_empty() {
        egui::CollapsingHeader::new("metadata").show(ui, |ui| {
            for (k, v) in extra {
                ui.label(format!("{k}: {}", display_value(v)));
            }
        });
    }

    ui.add_space(6.0);
    let target_name = ui_state
        .connect_target
        .as_ref()
        .and_then(|t| store.node(t))
        .map(|n| n.name.clone())
        .unwrap_or_else(|| "choose a memory".to_string());
    egui::ComboBox::from_id_source("connect_target")
        .selected_text(target_name)
        .show_ui(ui, |ui| {
            for n in store.graph().nodes.iter().filter(|n| n.id != id) {
                ui.selectable_value(&mut ui_state.connect_target, Some(n.id.clone()), &n.name);
            }
        });
    ui.add(egui::TextEdit::singleline(&mut ui_state.connect_relationship).hint_text("RELATED_TO"));
    if ui
        .add_enabled(ui_state.connect_target.is_some(), egui::Button::new("Connect"))
        .clicked()
    {
        if let Some(target) = ui_state.connect_target.take() {
            let rel = match ui_state.connect_relationship.trim() {
                "" => "RELATED_TO".to_string(),
                r => r.to_uppercase(),
            };
            if !edits::connect(store, agent, &id, &target, &rel) {
                store.set_error(Some("Those memories are already connected.".into()));
            }
            ui_state.connect_relationship.clear();
        }
    }

    ui.horizontal(|ui| {
        if ui.button("Focus").clicked() {
            focus.send(FocusNode::plain(id.clone()));
        }
        if ui.button("Delete").clicked() {
            edits::delete_memory(store, agent, &id);
        }
    });
}

fn add_memory_form(
    ui: &mut egui::Ui,
    store: &mut GraphStore,
    agent: Option<&AgentLink>,
    ui_state: &mut UiState,
) {
    ui.heading("Add memory");
    let form = &mut ui_state.form;
    ui.add(egui::TextEdit::singleline(&mut form.name).hint_text("Name"));
    egui::ComboBox::from_id_source("new_memory_type")
        .selected_text(form.node_type.as_str())
        .show_ui(ui, |ui| {
            for t in NodeType::ALL {
                ui.selectable_value(&mut form.node_type, t, t.as_str());
            }
        });
    ui.add(
        egui::TextEdit::multiline(&mut form.description)
            .hint_text("Description")
            .desired_rows(3),
    );

    let selected = store.view().selected.clone();
    ui.add_enabled(
        selected.is_some(),
        egui::Checkbox::new(&mut ui_state.link_to_selected, "Link to selected memory"),
    );

    let can_add = !ui_state.form.name.trim().is_empty();
    if ui.add_enabled(can_add, egui::Button::new("Add")).clicked() {
        let mut form = ui_state.form.clone();
        form.connect_to = selected.filter(|_| ui_state.link_to_selected);
        if let Some(id) = edits::create_memory(store, agent, &form) {
            ui_state.form = NewMemory::default();
            store.set_selected_node(Some(id));
        }
    }
}

fn settings_section(ui: &mut egui::Ui, cfg: &mut ViewerConfig, flags: &SceneFlags) {
    egui::CollapsingHeader::new("Settings").show(ui, |ui| {
        let mut changed = ui.checkbox(&mut cfg.show_labels, "Labels").changed();
        changed |= ui
            .add(egui::Slider::new(&mut cfg.node_size, 0.1..=2.0).text("node size"))
            .changed();
        if changed {
            flags.request_redraw();
        }
        if ui.button("Save settings").clicked() {
            match config::save(cfg) {
                Ok(()) => tracing::info!("viewer settings saved"),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "could not save settings"),
            }
        }
    });
}
