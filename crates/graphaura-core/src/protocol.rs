use serde::{Deserialize, Serialize};

use crate::{Extraction, GraphSnapshot, Link, Node, NodeId};

/// Frames exchanged between the viewer and the agent. Each frame is one JSON
/// document behind a length prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Msg {
    Hello { version: String },
    RequestSnapshot,
    Snapshot { nodes: Vec<Node>, links: Vec<Link> },
    Save { snapshot: GraphSnapshot },
    UpsertNode { node: Node },
    RemoveNode { id: NodeId },
    UpsertLink { link: Link },
    RemoveLink { source: NodeId, target: NodeId },
    NodePersisted { node: Node },
    Extraction { extraction: Extraction },
    Error { message: String },
    Ping,
    Pong,
}

impl Msg {
    pub fn snapshot(snapshot: GraphSnapshot) -> Self {
        Msg::Snapshot {
            nodes: snapshot.nodes,
            links: snapshot.links,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Hello { .. } => "hello",
            Msg::RequestSnapshot => "request_snapshot",
            Msg::Snapshot { .. } => "snapshot",
            Msg::Save { .. } => "save",
            Msg::UpsertNode { .. } => "upsert_node",
            Msg::RemoveNode { .. } => "remove_node",
            Msg::UpsertLink { .. } => "upsert_link",
            Msg::RemoveLink { .. } => "remove_link",
            Msg::NodePersisted { .. } => "node_persisted",
            Msg::Extraction { .. } => "extraction",
            Msg::Error { .. } => "error",
            Msg::Ping => "ping",
            Msg::Pong => "pong",
        }
    }
}
