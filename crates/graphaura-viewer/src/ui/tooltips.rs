use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};

use crate::graph::store::GraphStore;

pub fn render_tooltip(
    ctx: &egui::Context,
    id: &str,
    pos: egui::Pos2,
    lines: impl IntoIterator<Item = String>,
) {
    egui::Area::new(egui::Id::new(id))
        .order(egui::Order::Tooltip)
        .fixed_pos(pos)
        .show(ctx, |ui| {
            ui.group(|ui| {
                for line in lines {
                    ui.label(line);
                }
            });
        });
}

pub fn hover_tooltip(mut contexts: EguiContexts, store: Res<GraphStore>) {
    let Some(node) = store.view().hovered.as_ref().and_then(|id| store.node(id)) else {
        return;
    };
    let ctx = contexts.ctx_mut();
    let Some(pointer) = ctx.input(|i| i.pointer.hover_pos()) else {
        return;
    };

    let mut lines = vec![
        node.name.clone(),
        format!("type: {}", node.node_type.as_str()),
    ];
    if let Some(desc) = node.description() {
        lines.push(desc.to_string());
    }
    let degree = store.links_of(&node.id).count();
    lines.push(format!("{degree} relationships"));
    render_tooltip(ctx, "node_tooltip", pointer + egui::vec2(14.0, 14.0), lines);
}
