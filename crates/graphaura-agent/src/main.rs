mod config;
mod data_file;
mod server;

use anyhow::{Context, Result};
use config::{parse_args, runtime_sock_path};
use server::AgentState;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = parse_args()?;
    let sock_path = config.socket.clone().unwrap_or_else(runtime_sock_path);

    let graph = data_file::load_or_demo(config.data.as_deref())?;
    let extraction = config
        .ingest
        .as_deref()
        .map(data_file::load_extraction)
        .transpose()?;
    if config.data.is_none() {
        tracing::info!("no --data file given, changes are kept in memory only");
    }
    tracing::info!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        pending_extraction = extraction.is_some(),
        "graph loaded"
    );

    // Clean stale socket
    let _ = std::fs::remove_file(&sock_path);
    let listener =
        UnixListener::bind(&sock_path).with_context(|| format!("bind UDS {sock_path}"))?;
    tracing::info!(socket = %sock_path, "graphaura-agent listening");

    let state = Arc::new(Mutex::new(AgentState::new(graph, config.data, extraction)));
    server::run(listener, state).await
}
