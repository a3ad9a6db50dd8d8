use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use graphaura_core::{Extraction, GraphSnapshot, Link, Msg, Node, NodeId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::data_file;

/// Graph owned by the agent plus where it is written back to.
pub struct AgentState {
    graph: GraphSnapshot,
    data_path: Option<PathBuf>,
    pending_extraction: Option<Extraction>,
}

/// Frames to send back, and whether the graph changed.
#[derive(Debug, Default)]
pub struct Outcome {
    pub replies: Vec<Msg>,
    pub dirty: bool,
}

impl Outcome {
    fn reply(msg: Msg) -> Self {
        Self {
            replies: vec![msg],
            dirty: false,
        }
    }

    fn changed(dirty: bool) -> Self {
        Self {
            replies: Vec::new(),
            dirty,
        }
    }
}

impl AgentState {
    pub fn new(
        graph: GraphSnapshot,
        data_path: Option<PathBuf>,
        extraction: Option<Extraction>,
    ) -> Self {
        Self {
            graph,
            data_path,
            pending_extraction: extraction,
        }
    }

    pub fn handle(&mut self, msg: Msg) -> Outcome {
        match msg {
            Msg::Hello { version } => {
                tracing::info!(%version, "viewer said hello");
                Outcome::default()
            }
            Msg::RequestSnapshot => {
                // the served snapshot must already contain the extraction
                let pending = self.pending_extraction.take();
                if let Some(extraction) = &pending {
                    let (nodes, links) = extraction.clone().into_batch();
                    self.merge(nodes, links);
                }
                let mut out = Outcome::reply(Msg::snapshot(self.graph.clone()));
                if let Some(extraction) = pending {
                    out.replies.push(Msg::Extraction { extraction });
                    out.dirty = true;
                }
                out
            }
            Msg::Save { snapshot } => {
                let (clean, issues) = snapshot.sanitized();
                for issue in &issues {
                    tracing::warn!(%issue, "save carried inconsistent data");
                }
                self.graph = clean;
                Outcome::changed(true)
            }
            Msg::UpsertNode { mut node } => {
                node.metadata.insert("persisted".into(), true.into());
                self.upsert_node(node.clone());
                Outcome {
                    replies: vec![Msg::NodePersisted { node }],
                    dirty: true,
                }
            }
            Msg::RemoveNode { id } => Outcome::changed(self.remove_node(&id)),
            Msg::UpsertLink { link } => Outcome::changed(self.add_link(link)),
            Msg::RemoveLink { source, target } => {
                let before = self.graph.links.len();
                self.graph.links.retain(|l| !l.connects(&source, &target));
                Outcome::changed(self.graph.links.len() != before)
            }
            Msg::Ping => Outcome::reply(Msg::Pong),
            other => {
                tracing::debug!(kind = other.kind(), "ignoring frame");
                Outcome::default()
            }
        }
    }

    fn upsert_node(&mut self, node: Node) {
        match self.graph.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => self.graph.nodes.push(node),
        }
    }

    fn remove_node(&mut self, id: &NodeId) -> bool {
        let before = self.graph.nodes.len();
        self.graph.nodes.retain(|n| &n.id != id);
        if self.graph.nodes.len() == before {
            return false;
        }
        self.graph.links.retain(|l| !l.touches(id));
        true
    }

    fn add_link(&mut self, link: Link) -> bool {
        if !self.graph.contains_node(&link.source) || !self.graph.contains_node(&link.target) {
            tracing::warn!(link = %link.id(), "link references an unknown memory");
            return false;
        }
        if self.graph.has_link_between(&link.source, &link.target) {
            return false;
        }
        self.graph.links.push(link);
        true
    }

    fn merge(&mut self, nodes: Vec<Node>, links: Vec<Link>) {
        for node in nodes {
            self.upsert_node(node);
        }
        for link in links {
            self.add_link(link);
        }
    }

    pub fn persist(&self) -> Result<()> {
        match &self.data_path {
            Some(path) => data_file::save(path, &self.graph),
            None => Ok(()),
        }
    }
}

pub async fn run(listener: UnixListener, state: Arc<Mutex<AgentState>>) -> Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await.context("accept viewer")?;
        tracing::info!("viewer connected");
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = serve(stream, state).await {
                tracing::warn!(error = %format!("{e:#}"), "viewer connection failed");
            }
            tracing::info!("viewer disconnected");
        });
    }
}

async fn send(framed: &mut Framed<UnixStream, LengthDelimitedCodec>, msg: &Msg) -> Result<()> {
    let bytes = serde_json::to_vec(msg).with_context(|| format!("encode {}", msg.kind()))?;
    framed
        .send(tokio_util::bytes::Bytes::from(bytes))
        .await
        .with_context(|| format!("send {}", msg.kind()))
}

async fn serve(stream: UnixStream, state: Arc<Mutex<AgentState>>) -> Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let bytes = frame.context("read frame")?;
        let msg: Msg = match serde_json::from_slice(&bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame");
                send(&mut framed, &Msg::Error { message: format!("decode error: {e}") }).await?;
                continue;
            }
        };
        let kind = msg.kind();

        let replies = {
            let mut st = state.lock().await;
            let out = st.handle(msg);
            if out.dirty {
                if let Err(e) = st.persist() {
                    tracing::warn!(error = %format!("{e:#}"), kind, "could not persist graph");
                }
            }
            out.replies
        };
        for reply in replies.iter() {
            send(&mut framed, reply).await?;
        }
    }
    Ok(())
}
