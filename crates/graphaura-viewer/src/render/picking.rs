use bevy::prelude::*;
use bevy_egui::EguiContexts;
use graphaura_core::NodeId;

use crate::app::events::{ClickedEmpty, FocusNode, Picked};
use crate::graph::filter::VisibleCache;
use crate::graph::highlight::{hover_enter, hover_leave};
use crate::graph::layout::Layout;
use crate::graph::store::GraphStore;

const HOVER_RADIUS_PX: f32 = 18.0;
const CLICK_RADIUS_PX: f32 = 14.0;

/// Nearest candidate to `cursor` that lies within `max_px`.
pub fn closest_within(
    candidates: impl IntoIterator<Item = (NodeId, Vec2)>,
    cursor: Vec2,
    max_px: f32,
) -> Option<NodeId> {
    let mut best: Option<(f32, NodeId)> = None;
    for (id, screen) in candidates {
        let d = screen.distance(cursor);
        if d < max_px && best.as_ref().map(|(bd, _)| d < *bd).unwrap_or(true) {
            best = Some((d, id));
        }
    }
    best.map(|(_, id)| id)
}

fn node_under_cursor(
    cursor: Vec2,
    camera: &Camera,
    cam_tf: &GlobalTransform,
    cache: &VisibleCache,
    layout: &Layout,
    max_px: f32,
) -> Option<NodeId> {
    let visible = cache.current();
    let candidates = visible.nodes.iter().filter_map(|n| {
        let pos = layout.position(&n.id)?;
        let screen = camera.world_to_viewport(cam_tf, pos)?;
        Some((n.id.clone(), screen))
    });
    closest_within(candidates, cursor, max_px)
}

pub fn hover_detection(
    windows: Query<&Window>,
    cam_q: Query<(&Camera, &GlobalTransform)>,
    mut contexts: EguiContexts,
    mut store: ResMut<GraphStore>,
    cache: Res<VisibleCache>,
    layout: Res<Layout>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        hover_leave(&mut store);
        return;
    };
    let Ok((camera, cam_tf)) = cam_q.get_single() else {
        return;
    };
    let ctx = contexts.ctx_mut();
    if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
        return;
    }

    match node_under_cursor(cursor, camera, cam_tf, &cache, &layout, HOVER_RADIUS_PX) {
        Some(id) => hover_enter(&mut store, &id),
        None => hover_leave(&mut store),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn pick_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    cam_q: Query<(&Camera, &GlobalTransform)>,
    mut contexts: EguiContexts,
    cache: Res<VisibleCache>,
    layout: Res<Layout>,
    mut picked: EventWriter<Picked>,
    mut empty: EventWriter<ClickedEmpty>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let ctx = contexts.ctx_mut();
    if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
        return;
    }
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, cam_tf)) = cam_q.get_single() else {
        return;
    };

    match node_under_cursor(cursor, camera, cam_tf, &cache, &layout, CLICK_RADIUS_PX) {
        Some(id) => {
            picked.send(Picked(id));
        }
        None => {
            empty.send(ClickedEmpty);
        }
    }
}

pub fn apply_picks(
    mut picked: EventReader<Picked>,
    mut empty: EventReader<ClickedEmpty>,
    mut store: ResMut<GraphStore>,
    mut focus: EventWriter<FocusNode>,
) {
    for Picked(id) in picked.read() {
        store.set_selected_node(Some(id.clone()));
        focus.send(FocusNode::plain(id.clone()));
    }
    if empty.read().last().is_some() && store.view().selected.is_some() {
        store.set_selected_node(None);
    }
}
