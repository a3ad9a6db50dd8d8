use bevy::prelude::*;
use std::sync::atomic::Ordering;

use crate::app::events::{ClickedEmpty, FocusNode, Picked, StartTour};
use crate::app::resources::{NetRx, NetStatus, SceneFlags, ViewerSettings};
use crate::graph::edits::{apply_extraction, apply_persisted};
use crate::graph::filter::VisibleCache;
use crate::graph::layout::{update_layout, Layout};
use crate::graph::store::GraphStore;
use crate::graph::tour::GuidedTour;
use crate::net::{spawn_client, Incoming, IncomingKind};
use crate::render::{self, scene_active, CurrentScene, HighlightGizmos, RenderMode};
use crate::ui::{self, UiState};
use crate::util::cache::{cache_file_path, fallback_snapshot, CacheWriter};
use crate::util::config;

pub mod events;
pub mod resources;

/// Upper bound on network messages applied per frame.
const MAX_MESSAGES_PER_FRAME: usize = 256;

pub struct GraphAuraPlugin {
    /// Adapter reported by the start-up probe.
    pub adapter: String,
}

impl Plugin for GraphAuraPlugin {
    fn build(&self, app: &mut App) {
        let cfg = config::load_or_default();
        tracing::info!(adapter = %self.adapter, socket = %cfg.sock_path(), "starting viewer");

        let (tx, rx) = crossbeam_channel::unbounded();
        let agent = spawn_client(cfg.sock_path(), tx);

        let flags = SceneFlags::default();
        let redraw = flags.handle();
        let mut store = GraphStore::default();
        store.subscribe(move |change| {
            if change.affects_scene() {
                redraw.store(true, Ordering::Relaxed);
            }
        });
        store.add_sink(Box::new(agent.sink()));

        let cache_path = cfg.cache_enabled.then(cache_file_path).flatten();
        if let Some(path) = &cache_path {
            store.add_sink(Box::new(CacheWriter::spawn(path.clone())));
        }
        store.set_loading(true);

        let status = NetStatus {
            cache_path,
            ..default()
        };

        app.add_event::<Picked>()
            .add_event::<ClickedEmpty>()
            .add_event::<StartTour>()
            .add_event::<FocusNode>()
            .init_gizmo_group::<HighlightGizmos>()
            .insert_resource(store)
            .insert_resource(flags)
            .insert_resource(Layout::new(cfg.layout_params()))
            .insert_resource(GuidedTour::new(cfg.tour_settings()))
            .insert_resource(ViewerSettings(cfg))
            .insert_resource(NetRx(rx))
            .insert_resource(status)
            .insert_resource(agent)
            .init_resource::<RenderMode>()
            .init_resource::<VisibleCache>()
            .init_resource::<CurrentScene>()
            .init_resource::<UiState>()
            .add_systems(
                Startup,
                (render::setup_scene, render::configure_gizmos),
            )
            .add_systems(
                Update,
                (
                    (
                        pump_network,
                        ui::handle_shortcuts,
                        ui::ui_panel,
                        ui::help_overlay,
                        ui::hud_overlay,
                        render::fallback_panel,
                        render::start_tour,
                        update_layout,
                    )
                        .chain(),
                    (
                        ui::hover_tooltip,
                        render::hover_detection,
                        render::pick_on_click,
                        render::apply_picks,
                        render::run_tour,
                        render::focus_camera,
                        render::fly_camera,
                        render::orbit_camera,
                        render::rebuild_scene,
                        render::sync_transforms,
                        render::draw_links,
                        render::draw_labels,
                    )
                        .chain()
                        .run_if(scene_active),
                )
                    .chain(),
            );
    }
}

fn pump_network(rx: Res<NetRx>, mut store: ResMut<GraphStore>, mut status: ResMut<NetStatus>) {
    for msg in rx.0.try_iter().take(MAX_MESSAGES_PER_FRAME) {
        apply_incoming(&mut store, &mut status, msg);
    }
}

/// Loads the cache, or the demo graph, the first time the agent turns out to
/// be unavailable before it delivered anything.
fn fall_back(store: &mut GraphStore, status: &mut NetStatus, reason: &str) {
    if status.snapshot_received || status.fallback_source.is_some() {
        return;
    }
    let (snapshot, source) = fallback_snapshot(status.cache_path.as_deref());
    tracing::warn!(%reason, %source, "agent unavailable, using local data");
    store.set_graph_data(snapshot);
    store.set_error(Some(format!(
        "Memory agent unavailable, showing {source} data. Edits stay local."
    )));
    status.fallback_source = Some(source);
}

pub(crate) fn apply_incoming(store: &mut GraphStore, status: &mut NetStatus, msg: Incoming) {
    match msg.kind {
        IncomingKind::Connected => {
            tracing::info!(endpoint = %msg.endpoint, "agent connected");
            status.connected = true;
        }
        IncomingKind::Disconnected => {
            tracing::info!(endpoint = %msg.endpoint, "agent disconnected");
            status.connected = false;
            if status.snapshot_received {
                store.set_error(Some("Lost connection to the memory agent.".into()));
            } else {
                fall_back(store, status, "disconnected");
            }
        }
        IncomingKind::Snapshot(snapshot) => {
            status.snapshot_received = true;
            status.fallback_source = None;
            store.load_from_agent(snapshot);
        }
        IncomingKind::Extraction(extraction) => {
            apply_extraction(store, extraction);
        }
        IncomingKind::NodePersisted(node) => apply_persisted(store, node),
        IncomingKind::Other(other) => {
            tracing::debug!(kind = other.kind(), "ignoring agent message");
        }
        IncomingKind::Error(message) => {
            tracing::warn!(endpoint = %msg.endpoint, %message, "agent error");
            if status.connected || status.snapshot_received {
                store.set_error(Some(message));
            } else {
                fall_back(store, status, &message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphaura_core::demo::demo_snapshot;
    use graphaura_core::{GraphSnapshot, Msg, Node, NodeType};

    const EP: &str = "/tmp/test.sock";

    fn loading_store() -> GraphStore {
        let mut store = GraphStore::default();
        store.set_loading(true);
        store
    }

    #[test]
    fn snapshot_replaces_graph_and_clears_loading() {
        let mut store = loading_store();
        let mut status = NetStatus::default();
        apply_incoming(&mut store, &mut status, Incoming::connected(EP));
        apply_incoming(
            &mut store,
            &mut status,
            Incoming::from_msg(EP, Msg::snapshot(demo_snapshot())),
        );
        assert!(status.connected && status.snapshot_received);
        assert_eq!(store.graph().nodes.len(), 33);
        assert!(!store.view().is_loading);
        assert!(store.view().error.is_none());
    }

    #[test]
    fn unreachable_agent_falls_back_to_demo_once() {
        let mut store = loading_store();
        let mut status = NetStatus::default();
        apply_incoming(
            &mut store,
            &mut status,
            Incoming::error(EP, "connect UDS: no such file".into()),
        );
        assert_eq!(status.fallback_source, Some("demo"));
        assert_eq!(store.graph().nodes.len(), 33);
        assert!(!store.view().is_loading);
        assert!(store.view().error.is_some());

        store.add_node(Node::new("local-1", "Scratch", NodeType::Other));
        apply_incoming(&mut store, &mut status, Incoming::disconnected(EP));
        assert!(store.node(&"local-1".into()).is_some());
    }

    #[test]
    fn late_disconnect_keeps_the_graph() {
        let mut store = GraphStore::default();
        let mut status = NetStatus::default();
        apply_incoming(
            &mut store,
            &mut status,
            Incoming::from_msg(EP, Msg::snapshot(GraphSnapshot::default())),
        );
        apply_incoming(&mut store, &mut status, Incoming::disconnected(EP));
        assert_eq!(status.fallback_source, None);
        assert!(store.graph().nodes.is_empty());
        assert!(store.view().error.is_some());
    }

    #[test]
    fn served_snapshot_is_not_echoed_but_fallback_is() {
        use crate::graph::store::{SnapshotOrigin, SnapshotSink};
        use std::sync::{Arc, Mutex};

        struct Origins(Arc<Mutex<Vec<SnapshotOrigin>>>);
        impl SnapshotSink for Origins {
            fn save(&self, _snapshot: Arc<GraphSnapshot>, origin: SnapshotOrigin) {
                self.0.lock().unwrap().push(origin);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = GraphStore::default();
        store.add_sink(Box::new(Origins(Arc::clone(&seen))));
        let mut status = NetStatus::default();
        apply_incoming(&mut store, &mut status, Incoming::error(EP, "refused".into()));
        apply_incoming(
            &mut store,
            &mut status,
            Incoming::from_msg(EP, Msg::snapshot(demo_snapshot())),
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SnapshotOrigin::Local, SnapshotOrigin::Agent]
        );
    }

    #[test]
    fn pong_and_hello_are_ignored() {
        let mut store = GraphStore::default();
        let mut status = NetStatus::default();
        let before = store.revision();
        apply_incoming(&mut store, &mut status, Incoming::from_msg(EP, Msg::Pong));
        assert_eq!(store.revision(), before);
        assert!(store.view().error.is_none());
    }
}
