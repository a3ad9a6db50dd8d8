use bevy::prelude::Res;
use bevy_egui::{egui, EguiContexts};

use crate::app::resources::NetStatus;
use crate::graph::filter::VisibleCache;
use crate::graph::tour::GuidedTour;

pub fn hud_overlay(
    mut contexts: EguiContexts,
    cache: Res<VisibleCache>,
    tour: Res<GuidedTour>,
    status: Res<NetStatus>,
) {
    let visible = cache.current();
    egui::Area::new(egui::Id::new("hud"))
        .order(egui::Order::Foreground)
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.group(|ui| {
                ui.label(format!(
                    "Visible: {} memories / {} links",
                    visible.nodes.len(),
                    visible.links.len()
                ));
                if let Some((stop, total)) = tour.progress() {
                    ui.label(format!("Tour: stop {stop} of {total}"));
                }
                match (status.connected, status.fallback_source) {
                    (true, _) => ui.label("Agent: connected"),
                    (false, Some(source)) => ui.label(format!("Agent: offline, {source} data")),
                    (false, None) => ui.label("Agent: connecting"),
                };
            });
        });
}
