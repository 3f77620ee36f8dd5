//! WebSocket JSON-RPC server
//!
//! Binds the configured address, authenticates clients with a `?auth=`
//! token, routes requests through [`crate::rpc::router`] and pushes a
//! `promptCreated` notification to every client when a public prompt is
//! created.

mod connection;
mod hub;

use std::{net::SocketAddr, sync::Arc};

use serde_json::json;
use tokio::{
    net::TcpListener,
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
};

pub use hub::{ClientId, Hub};

use crate::{app::App, errors::Result, rpc::Notification, util::generate_token};

pub const PROMPT_CREATED: &str = "promptCreated";

/// Server handle for lifecycle management
pub struct ServerHandle {
    addr: SocketAddr,
    token: String,
    hub: Hub,
    shutdown: watch::Sender<bool>,
    accept: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Connection URL including the auth token
    pub fn url(&self) -> String {
        format!("ws://{}/?auth={}", self.addr, self.token)
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow() && !self.accept.is_finished()
    }

    /// Stop accepting, close open connections and wait for the accept loop
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        self.forwarder.abort();
        let _ = self.accept.await;
        tracing::info!(addr = %self.addr, "server stopped");
    }
}

/// Start the server for `app`
///
/// Uses `app.config.auth_token` when set, otherwise generates one.
pub async fn start(app: Arc<App>) -> Result<ServerHandle> {
    let listener = TcpListener::bind(&app.config.bind_address).await?;
    let addr = listener.local_addr()?;

    let token = app
        .config
        .auth_token
        .clone()
        .unwrap_or_else(|| generate_token(32));

    let hub = Hub::new();
    let (shutdown, shutdown_rx) = watch::channel(false);

    let forwarder = tokio::spawn(forward_prompt_events(app.clone(), hub.clone()));
    let accept = tokio::spawn(run_accept_loop(
        listener,
        Arc::from(token.as_str()),
        hub.clone(),
        app,
        shutdown_rx,
    ));

    tracing::info!(%addr, "server listening");

    Ok(ServerHandle {
        addr,
        token,
        hub,
        shutdown,
        accept,
        forwarder,
    })
}

async fn run_accept_loop(
    listener: TcpListener,
    token: Arc<str>,
    hub: Hub,
    app: Arc<App>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted tcp connection");
                    tokio::spawn(connection::handle_connection(
                        stream,
                        token.clone(),
                        hub.clone(),
                        app.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
    }
}

/// Broadcast public prompt creations to all connected clients
async fn forward_prompt_events(app: Arc<App>, hub: Hub) {
    let mut events = app.prompts.subscribe();
    loop {
        match events.recv().await {
            Ok(event) if event.is_public => {
                let notification = Notification::new(PROMPT_CREATED, json!(event));
                match serde_json::to_string(&notification) {
                    Ok(text) => hub.broadcast(&text),
                    Err(e) => tracing::error!(error = %e, "failed to encode notification"),
                }
            }
            Ok(_) => {},
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "prompt event stream lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
