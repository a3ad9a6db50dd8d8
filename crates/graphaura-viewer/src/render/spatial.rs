use bevy::color::{Alpha, LinearRgba};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use graphaura_core::NodeId;
use std::sync::Arc;

use crate::app::resources::{SceneFlags, ViewerSettings};
use crate::graph::filter::VisibleCache;
use crate::graph::layout::Layout;
use crate::graph::store::GraphStore;
use crate::render::scene::{
    build_scene, NodeVisual, SceneStyle, HIGHLIGHT_LINK_WIDTH, LINK_WIDTH,
};
use crate::render::{CurrentScene, RenderMode};

const PARTICLE_SPEED: f32 = 0.45;
const PARTICLE_RADIUS: f32 = 0.08;

/// Wider lines for highlighted links.
#[derive(Default, Reflect, GizmoConfigGroup)]
pub struct HighlightGizmos;

#[derive(Component)]
pub struct NodeMarker {
    pub id: NodeId,
}

#[derive(Component)]
pub struct GlowShellMarker;

pub fn configure_gizmos(mut store: ResMut<GizmoConfigStore>) {
    let (cfg, _) = store.config_mut::<DefaultGizmoConfigGroup>();
    cfg.line_width = LINK_WIDTH;
    let (cfg, _) = store.config_mut::<HighlightGizmos>();
    cfg.line_width = HIGHLIGHT_LINK_WIDTH;
}

fn node_material(nv: &NodeVisual) -> StandardMaterial {
    StandardMaterial {
        base_color: nv.color.with_alpha(nv.alpha),
        emissive: LinearRgba::from(nv.color) * nv.emissive,
        alpha_mode: if nv.alpha < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        perceptual_roughness: 0.6,
        ..default()
    }
}

fn glow_material(color: Color, alpha: f32) -> StandardMaterial {
    StandardMaterial {
        base_color: color.with_alpha(alpha),
        emissive: LinearRgba::from(color) * (alpha * 4.0),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    }
}

/// Positions of the particles riding a link from `a` to `b` at time `t`.
pub fn particle_positions(a: Vec3, b: Vec3, count: u32, t: f32) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let phase = (t * PARTICLE_SPEED + i as f32 / count as f32).fract();
            a.lerp(b, phase)
        })
        .collect()
}

/// Respawns node entities when the store has flagged a scene change.
#[allow(clippy::too_many_arguments)]
pub fn rebuild_scene(
    mut commands: Commands,
    store: Res<GraphStore>,
    cache: Res<VisibleCache>,
    layout: Res<Layout>,
    settings: Res<ViewerSettings>,
    flags: Res<SceneFlags>,
    mut scene: ResMut<CurrentScene>,
    mut mode: ResMut<RenderMode>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    query: Query<Entity, With<NodeMarker>>,
) {
    if !flags.take_redraw() {
        return;
    }
    let style = SceneStyle {
        node_size: settings.0.node_size,
        show_labels: settings.0.show_labels,
    };
    let built = build_scene(&cache.current(), store.view(), layout.positions(), style);

    for e in query.iter() {
        commands.entity(e).despawn_recursive();
    }

    let desc = match built {
        Ok(desc) => desc,
        Err(e) => {
            tracing::error!(error = %e, "scene construction failed, switching to text summary");
            *mode = RenderMode::Fallback {
                reason: e.to_string(),
            };
            scene.0 = Arc::default();
            return;
        }
    };

    let sphere = meshes.add(Sphere::new(1.0));
    for nv in desc.nodes.iter() {
        let material = mats.add(node_material(nv));
        let shells: Vec<(Handle<StandardMaterial>, f32)> = nv
            .glow
            .iter()
            .map(|shell| {
                (
                    mats.add(glow_material(nv.color, shell.alpha)),
                    shell.radius / nv.radius,
                )
            })
            .collect();

        commands
            .spawn((
                PbrBundle {
                    mesh: sphere.clone(),
                    material,
                    transform: Transform::from_translation(nv.position)
                        .with_scale(Vec3::splat(nv.radius)),
                    ..default()
                },
                NodeMarker { id: nv.id.clone() },
            ))
            .with_children(|parent| {
                for (material, scale) in shells {
                    parent.spawn((
                        PbrBundle {
                            mesh: sphere.clone(),
                            material,
                            transform: Transform::from_scale(Vec3::splat(scale)),
                            ..default()
                        },
                        GlowShellMarker,
                    ));
                }
            });
    }
    tracing::debug!(nodes = desc.nodes.len(), links = desc.links.len(), "scene rebuilt");
    scene.0 = Arc::new(desc);
}

/// Per-frame: follow the layout without rebuilding anything.
pub fn sync_transforms(layout: Res<Layout>, mut q: Query<(&NodeMarker, &mut Transform)>) {
    for (marker, mut tf) in q.iter_mut() {
        if let Some(p) = layout.position(&marker.id).filter(|p| p.is_finite()) {
            tf.translation = p;
        }
    }
}

pub fn draw_links(
    time: Res<Time>,
    scene: Res<CurrentScene>,
    layout: Res<Layout>,
    mut gizmos: Gizmos,
    mut highlight: Gizmos<HighlightGizmos>,
) {
    let t = time.elapsed_seconds();
    for link in scene.0.links.iter() {
        let (Some(a), Some(b)) = (layout.position(&link.source), layout.position(&link.target))
        else {
            continue;
        };
        if !link.highlighted {
            gizmos.line(a, b, link.color);
            continue;
        }
        highlight.line(a, b, link.color);
        for p in particle_positions(a, b, link.particles, t) {
            highlight.sphere(p, Quat::IDENTITY, PARTICLE_RADIUS, link.color);
        }
    }
}

/// Billboard labels, painted in screen space so they always face the camera.
pub fn draw_labels(
    mut contexts: EguiContexts,
    scene: Res<CurrentScene>,
    layout: Res<Layout>,
    cam_q: Query<(&Camera, &GlobalTransform)>,
) {
    let Ok((camera, cam_tf)) = cam_q.get_single() else {
        return;
    };
    let ctx = contexts.ctx_mut();
    let painter = ctx
        .layer_painter(egui::LayerId::new(
            egui::Order::Background,
            egui::Id::new("node_labels"),
        ))
        .with_clip_rect(ctx.available_rect());

    for nv in scene.0.nodes.iter() {
        let Some(label) = nv.label.as_ref() else {
            continue;
        };
        let Some(pos) = layout.position(&nv.id) else {
            continue;
        };
        let anchor = pos + Vec3::Y * (nv.radius + 0.25);
        let Some(screen) = camera.world_to_viewport(cam_tf, anchor) else {
            continue;
        };
        let alpha = (label.alpha.clamp(0.0, 1.0) * 255.0) as u8;
        painter.text(
            egui::pos2(screen.x, screen.y),
            egui::Align2::CENTER_BOTTOM,
            &label.text,
            egui::FontId::proportional(label.size),
            egui::Color32::from_white_alpha(alpha),
        );
    }
}
