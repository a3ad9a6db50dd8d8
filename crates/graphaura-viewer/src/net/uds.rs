use anyhow::{Context, Result};
use bevy::prelude::Resource;
use crossbeam_channel::Sender;
use futures_util::{SinkExt, StreamExt};
use graphaura_core::{GraphSnapshot, Msg};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::graph::store::{SnapshotOrigin, SnapshotSink};
use crate::net::Incoming;

/// Outgoing half of the agent connection, shared with the ECS.
#[derive(Resource, Clone)]
pub struct AgentLink {
    tx: UnboundedSender<Msg>,
    connected: Arc<AtomicBool>,
}

impl AgentLink {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Queues a message for the agent. Dropped with a debug log while the
    /// agent is unreachable.
    pub fn send(&self, msg: Msg) {
        if !self.is_connected() {
            tracing::debug!(kind = msg.kind(), "agent offline, not sending");
            return;
        }
        if self.tx.send(msg).is_err() {
            tracing::debug!("agent connection closed");
        }
    }

    pub fn sink(&self) -> AgentSink {
        AgentSink(self.clone())
    }
}

/// Forwards locally built snapshots to the agent as `Save` frames. Snapshots
/// the agent served are not sent back.
pub struct AgentSink(AgentLink);

impl SnapshotSink for AgentSink {
    fn save(&self, snapshot: Arc<GraphSnapshot>, origin: SnapshotOrigin) {
        if origin == SnapshotOrigin::Agent {
            return;
        }
        self.0.send(Msg::Save {
            snapshot: (*snapshot).clone(),
        });
    }
}

pub fn spawn_client(sock_path: String, tx: Sender<Incoming>) -> AgentLink {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let connected = Arc::new(AtomicBool::new(false));
    let link = AgentLink {
        tx: out_tx,
        connected: Arc::clone(&connected),
    };

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = tx.send(Incoming::error(&sock_path, format!("tokio runtime: {e}")));
                let _ = tx.send(Incoming::disconnected(&sock_path));
                return;
            }
        };
        rt.block_on(async {
            let res = run(&sock_path, &tx, out_rx, &connected).await;
            connected.store(false, Ordering::Relaxed);
            if let Err(e) = res {
                let _ = tx.send(Incoming::error(&sock_path, format!("{e:#}")));
            }
            let _ = tx.send(Incoming::disconnected(&sock_path));
        });
    });

    link
}

fn encode(msg: &Msg) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).with_context(|| format!("encode {}", msg.kind()))
}

async fn run(
    sock_path: &str,
    tx: &Sender<Incoming>,
    mut out_rx: UnboundedReceiver<Msg>,
    connected: &AtomicBool,
) -> Result<()> {
    let stream = UnixStream::connect(sock_path)
        .await
        .with_context(|| format!("connect UDS {sock_path}"))?;
    let (mut sink, mut frames) = Framed::new(stream, LengthDelimitedCodec::new()).split();

    connected.store(true, Ordering::Relaxed);
    let _ = tx.send(Incoming::connected(sock_path));

    let hello = Msg::Hello {
        version: env!("CARGO_PKG_VERSION").into(),
    };
    sink.send(Bytes::from(encode(&hello)?)).await?;
    sink.send(Bytes::from(encode(&Msg::RequestSnapshot)?)).await?;

    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else { break };
                let bytes = frame.context("read frame")?;
                match serde_json::from_slice::<Msg>(&bytes) {
                    Ok(Msg::Ping) => sink.send(Bytes::from(encode(&Msg::Pong)?)).await?,
                    Ok(msg) => {
                        tracing::debug!(kind = msg.kind(), "agent frame");
                        let _ = tx.send(Incoming::from_msg(sock_path, msg));
                    }
                    Err(e) => {
                        let _ = tx.send(Incoming::error(sock_path, format!("decode error: {e}")));
                    }
                }
            }
            out = out_rx.recv() => {
                let Some(msg) = out else { break };
                sink.send(Bytes::from(encode(&msg)?))
                    .await
                    .with_context(|| format!("send {}", msg.kind()))?;
            }
        }
    }
    Ok(())
}

/// One-shot request used when no window is available.
pub fn fetch_snapshot(sock_path: &str, timeout: Duration) -> Result<GraphSnapshot> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("tokio runtime")?;
    rt.block_on(async {
        tokio::time::timeout(timeout, fetch(sock_path))
            .await
            .context("agent did not answer in time")?
    })
}

async fn fetch(sock_path: &str) -> Result<GraphSnapshot> {
    let stream = UnixStream::connect(sock_path)
        .await
        .with_context(|| format!("connect UDS {sock_path}"))?;
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    framed.send(Bytes::from(encode(&Msg::RequestSnapshot)?)).await?;
    while let Some(frame) = framed.next().await {
        let bytes = frame.context("read frame")?;
        if let Ok(Msg::Snapshot { nodes, links }) = serde_json::from_slice::<Msg>(&bytes) {
            return Ok(GraphSnapshot::new(nodes, links));
        }
    }
    anyhow::bail!("agent closed the connection before sending a snapshot")
}
