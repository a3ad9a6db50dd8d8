use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use std::time::Duration;

use crate::app::events::{FocusNode, StartTour};
use crate::app::resources::ViewerSettings;
use crate::graph::filter::VisibleCache;
use crate::graph::layout::Layout;
use crate::graph::store::GraphStore;
use crate::graph::tour::{GuidedTour, TourTick};

const ORBIT_SPEED: f32 = 0.005;
const MIN_ORBIT_RADIUS: f32 = 2.0;
const MAX_ORBIT_RADIUS: f32 = 400.0;
const MAX_PITCH: f32 = 1.5;

/// Camera spot for looking at `node` from `distance` further out along the
/// ray from the origin through it. A node sitting on the origin is viewed
/// from +Z.
pub fn focus_target(node: Vec3, distance: f32) -> Vec3 {
    let len = node.length();
    if len < 1e-3 {
        return node + Vec3::new(0.0, 0.0, distance);
    }
    node * (1.0 + distance / len)
}

pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// New eye position after a drag (pixels) and a wheel step around `center`.
pub fn orbit(eye: Vec3, center: Vec3, drag: Vec2, scroll: f32) -> Vec3 {
    let offset = eye - center;
    let radius = offset.length().max(MIN_ORBIT_RADIUS);
    let yaw = offset.x.atan2(offset.z) - drag.x * ORBIT_SPEED;
    let pitch = ((offset.y / radius).clamp(-1.0, 1.0).asin() + drag.y * ORBIT_SPEED)
        .clamp(-MAX_PITCH, MAX_PITCH);
    let radius = (radius * (1.0 - scroll * 0.1)).clamp(MIN_ORBIT_RADIUS, MAX_ORBIT_RADIUS);
    center + radius * Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    from: Vec3,
    to: Vec3,
    from_look: Vec3,
    to_look: Vec3,
    elapsed: f32,
    duration: f32,
}

impl Flight {
    pub fn new(from: Vec3, to: Vec3, from_look: Vec3, to_look: Vec3, duration: Duration) -> Self {
        Self {
            from,
            to,
            from_look,
            to_look,
            elapsed: 0.0,
            duration: duration.as_secs_f32(),
        }
    }

    /// Moves the flight forward and returns (eye, look target, finished).
    pub fn advance(&mut self, dt: f32) -> (Vec3, Vec3, bool) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        };
        let k = ease_in_out(t);
        (
            self.from.lerp(self.to, k),
            self.from_look.lerp(self.to_look, k),
            t >= 1.0,
        )
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct CameraRig {
    pub look_at: Vec3,
    pub flight: Option<Flight>,
}

pub fn setup_scene(mut commands: Commands, settings: Res<ViewerSettings>) {
    commands.insert_resource(ClearColor(Color::srgb(0.02, 0.02, 0.05)));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 250.0,
    });

    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 5_000_000.0,
            range: 200.0,
            shadows_enabled: false,
            ..default()
        },
        transform: Transform::from_xyz(10.0, 20.0, 10.0),
        ..default()
    });

    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform: Transform::from_xyz(0.0, 18.0, 28.0).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        BloomSettings {
            intensity: settings.0.bloom_intensity,
            ..BloomSettings::NATURAL
        },
        CameraRig::default(),
    ));
}

pub fn focus_camera(
    mut events: EventReader<FocusNode>,
    layout: Res<Layout>,
    settings: Res<ViewerSettings>,
    mut cam_q: Query<(&Transform, &mut CameraRig)>,
) {
    for ev in events.read() {
        let Some(node) = layout.position(&ev.id) else {
            tracing::debug!(id = %ev.id, "focus target has no position");
            continue;
        };
        let Ok((tf, mut rig)) = cam_q.get_single_mut() else {
            return;
        };
        let target = focus_target(node, settings.0.focus_distance) + ev.jitter;
        let duration = ev.duration.unwrap_or_else(|| settings.0.focus_duration());
        let from_look = rig.look_at;
        rig.flight = Some(Flight::new(tf.translation, target, from_look, node, duration));
    }
}

pub fn fly_camera(time: Res<Time>, mut cam_q: Query<(&mut Transform, &mut CameraRig)>) {
    let Ok((mut tf, mut rig)) = cam_q.get_single_mut() else {
        return;
    };
    let rig = &mut *rig;
    let Some(flight) = rig.flight.as_mut() else {
        return;
    };
    let (eye, look, done) = flight.advance(time.delta_seconds());
    tf.translation = eye;
    tf.look_at(look, Vec3::Y);
    rig.look_at = look;
    if done {
        rig.flight = None;
    }
}

pub fn orbit_camera(
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    mut wheel: EventReader<MouseWheel>,
    mut contexts: EguiContexts,
    mut cam_q: Query<(&mut Transform, &mut CameraRig)>,
) {
    let drag: Vec2 = motion.read().map(|m| m.delta).sum();
    let scroll: f32 = wheel
        .read()
        .map(|w| match w.unit {
            MouseScrollUnit::Line => w.y,
            MouseScrollUnit::Pixel => w.y / 40.0,
        })
        .sum();

    let ctx = contexts.ctx_mut();
    if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
        return;
    }
    let drag = if buttons.pressed(MouseButton::Right) {
        drag
    } else {
        Vec2::ZERO
    };
    if drag == Vec2::ZERO && scroll == 0.0 {
        return;
    }

    let Ok((mut tf, mut rig)) = cam_q.get_single_mut() else {
        return;
    };
    rig.flight = None;
    tf.translation = orbit(tf.translation, rig.look_at, drag, scroll);
    tf.look_at(rig.look_at, Vec3::Y);
}

pub fn start_tour(
    mut events: EventReader<StartTour>,
    mut tour: ResMut<GuidedTour>,
    cache: Res<VisibleCache>,
) {
    if events.read().last().is_none() {
        return;
    }
    let visible = cache.current();
    if !tour.start(&visible.nodes) && !tour.is_running() {
        tracing::info!("nothing visible to tour");
    }
}

/// Steps the running tour: each stop selects its node, marks it as the tour
/// target and flies the camera there. The camera stays at the last stop.
pub fn run_tour(
    time: Res<Time>,
    mut tour: ResMut<GuidedTour>,
    mut store: ResMut<GraphStore>,
    cache: Res<VisibleCache>,
    layout: Res<Layout>,
    mut focus: EventWriter<FocusNode>,
) {
    if !tour.is_running() {
        return;
    }
    let visible = cache.current();
    let tick = tour.tick(time.delta(), |id| {
        visible.contains(id) && layout.position(id).is_some()
    });
    match tick {
        TourTick::Visit(stop) => {
            tracing::debug!(id = %stop.id, index = stop.index, "tour stop");
            store.set_selected_node(Some(stop.id.clone()));
            store.set_tour_target(Some(stop.id.clone()));
            focus.send(FocusNode {
                id: stop.id,
                jitter: stop.jitter,
                duration: Some(stop.flight),
            });
        }
        TourTick::Finished => finish_tour(&mut store),
        TourTick::Idle | TourTick::Waiting => {}
    }
}

/// Clears the tour target, and the selection too unless the user picked
/// something else during the tour.
fn finish_tour(store: &mut GraphStore) {
    let view = store.view();
    let clear_selection = view.selected.is_some() && view.selected == view.tour_target;
    store.set_tour_target(None);
    if clear_selection {
        store.set_selected_node(None);
    }
}
