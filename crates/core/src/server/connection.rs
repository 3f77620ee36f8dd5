//! Per-connection WebSocket handling with tokio-tungstenite

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{
        mpsc::{self, UnboundedReceiver},
        watch,
    },
    time::{interval, Instant},
};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Error as WsError, Message,
    },
    WebSocketStream,
};
use url::Url;

use super::hub::{ClientId, Hub};
use crate::{
    app::{App, Session},
    rpc::router,
    util::ct_eq,
};

/// Ping interval - send ping every 30 seconds
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for detecting dead connections (60 seconds without pong)
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Handle a single WebSocket connection
///
/// Lifecycle: handshake with token check → register → message loop →
/// unregister. Each connection has its own [`Session`], dropped with it.
pub async fn handle_connection(
    stream: TcpStream,
    expected_token: Arc<str>,
    hub: Hub,
    app: Arc<App>,
    shutdown: watch::Receiver<bool>,
) {
    let client_id = Hub::next_client_id();

    let websocket = match accept_with_auth(stream, &expected_token).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(client_id, error = %e, "handshake rejected");
            return;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    hub.register(client_id, tx);
    tracing::info!(client_id, clients = hub.client_count(), "client connected");

    let session = Session::new();
    match run_message_loop(websocket, rx, client_id, &app, &session, shutdown).await {
        Ok(reason) => tracing::info!(client_id, reason, "client disconnected"),
        Err(e) => tracing::warn!(client_id, error = %e, "connection closed with error"),
    }

    hub.unregister(client_id);
}

/// Run the WebSocket message loop
///
/// Requests are answered in arrival order. Hub messages are forwarded as
/// they come in.
async fn run_message_loop(
    websocket: WebSocketStream<TcpStream>,
    mut outbound_rx: UnboundedReceiver<String>,
    client_id: ClientId,
    app: &App,
    session: &Session,
    mut shutdown: watch::Receiver<bool>,
) -> Result<&'static str, WsError> {
    let (mut write, mut read) = websocket.split();

    let mut ping_interval = interval(PING_INTERVAL);
    let mut last_pong = Instant::now();

    loop {
        if *shutdown.borrow() {
            let _ = write.close().await;
            return Ok("server shutdown");
        }

        if last_pong.elapsed() >= PONG_TIMEOUT {
            let _ = write.close().await;
            return Ok("pong timeout");
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    let _ = write.close().await;
                    return Ok("server shutdown");
                }
            }

            _ = ping_interval.tick() => {
                write.send(Message::Ping(Vec::new().into())).await?;
            }

            Some(msg) = outbound_rx.recv() => {
                write.send(Message::Text(msg.into())).await?;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handle_text_message(app, session, client_id, text.as_str()).await;
                        if let Some(reply) = reply {
                            write.send(Message::Text(reply.into())).await?;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let _ = write.send(Message::Close(frame)).await;
                        return Ok("normal closure");
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Ok("stream ended"),
                    _ => {}
                }
            }
        }
    }
}

/// Route one JSON-RPC text frame; returns the reply to send, if any
async fn handle_text_message(
    app: &App,
    session: &Session,
    client_id: ClientId,
    text: &str,
) -> Option<String> {
    match router::handle_text(app, session, text).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(client_id, error = %e, "unreadable message");
            Some(router::parse_error_response(&e))
        }
    }
}

fn reject(status: http::StatusCode, body: &str) -> ErrorResponse {
    let mut response = http::Response::new(Some(body.to_string()));
    *response.status_mut() = status;
    response
}

/// Accept WebSocket with `?auth=<token>` authentication
async fn accept_with_auth(
    stream: TcpStream,
    expected_token: &str,
) -> Result<WebSocketStream<TcpStream>, WsError> {
    let callback = |req: &Request, response: Response| {
        let full_url = format!(
            "ws://{}{}",
            req.uri()
                .authority()
                .map(|a| a.as_str())
                .unwrap_or("localhost"),
            req.uri()
        );

        let url = match Url::parse(&full_url) {
            Ok(url) => url,
            Err(_) => return Err(reject(http::StatusCode::BAD_REQUEST, "Bad Request")),
        };

        let auth_token = url
            .query_pairs()
            .find(|(key, _)| key == "auth")
            .map(|(_, value)| value.into_owned());

        match auth_token {
            Some(token) if ct_eq(&token, expected_token) => Ok(response),
            _ => {
                tracing::warn!("rejected connection with missing or invalid token");
                Err(reject(http::StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
    };

    accept_hdr_async(stream, callback).await
}
