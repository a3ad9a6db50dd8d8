use graphaura_core::{Extraction, GraphSnapshot, Msg, Node};

#[derive(Debug, Clone)]
pub struct Incoming {
    pub endpoint: String,
    pub kind: IncomingKind,
}

#[derive(Debug, Clone)]
pub enum IncomingKind {
    Connected,
    Disconnected,
    Snapshot(GraphSnapshot),
    Extraction(Extraction),
    NodePersisted(Node),
    Other(Msg),
    Error(String),
}

impl Incoming {
    pub fn new(endpoint: &str, kind: IncomingKind) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            kind,
        }
    }

    pub fn connected(endpoint: &str) -> Self {
        Self::new(endpoint, IncomingKind::Connected)
    }

    pub fn disconnected(endpoint: &str) -> Self {
        Self::new(endpoint, IncomingKind::Disconnected)
    }

    pub fn error(endpoint: &str, message: String) -> Self {
        Self::new(endpoint, IncomingKind::Error(message))
    }

    /// Sorts a decoded frame into what the viewer acts on.
    pub fn from_msg(endpoint: &str, msg: Msg) -> Self {
        let kind = match msg {
            Msg::Snapshot { nodes, links } => {
                IncomingKind::Snapshot(GraphSnapshot::new(nodes, links))
            }
            Msg::Extraction { extraction } => IncomingKind::Extraction(extraction),
            Msg::NodePersisted { node } => IncomingKind::NodePersisted(node),
            Msg::Error { message } => IncomingKind::Error(message),
            other => IncomingKind::Other(other),
        };
        Self::new(endpoint, kind)
    }
}
