use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use synapse_core::auth::{self, Claims};
use synapse_core::SessionLimits;
use synapse_telemetry::MetricsRecorder;

use crate::bridge::Bridge;
use crate::rpc::{McpError, McpMessage};
use crate::session::{Session, SessionRegistry};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Protocol transport configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Inbound frames above this many bytes are answered with an error and
    /// dropped; the connection stays open.
    pub max_frame_bytes: usize,
    /// Per-session admission policy; a fresh limiter is built from this for
    /// every accepted connection.
    pub limits: SessionLimits,
    /// HS256 secret for bearer-token verification. None disables the
    /// authorization path.
    pub auth_secret: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            max_frame_bytes: 1 << 20,
            limits: SessionLimits::default(),
            auth_secret: None,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub registry: Arc<SessionRegistry>,
    pub metrics: Option<Arc<MetricsRecorder>>,
    pub config: Arc<ServerConfig>,
}

/// Build the Axum router for the protocol endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", get(ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind and serve the protocol transport. Returns a handle that keeps the
/// accept loop alive.
pub async fn start(
    config: ServerConfig,
    bridge: Arc<Bridge>,
    registry: Arc<SessionRegistry>,
    metrics: Option<Arc<MetricsRecorder>>,
) -> Result<ServerHandle, std::io::Error> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let state = AppState {
        bridge,
        registry,
        metrics,
        config: Arc::new(config),
    };
    let router = build_router(state);

    tracing::info!(port = local_addr.port(), "mcp transport listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()` — keeps the accept loop alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// WebSocket upgrade handler. When an auth secret is configured, the bearer
/// token is verified here and the claims travel with the session; absent or
/// invalid tokens leave the session unauthenticated, and the gated methods
/// fail closed at dispatch.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = state
        .config
        .auth_secret
        .as_ref()
        .and_then(|secret| verify_bearer(&headers, secret));
    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

fn verify_bearer(headers: &HeaderMap, secret: &SecretString) -> Option<Claims> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))?;
    match auth::verify_token(token, secret.expose_secret()) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "bearer token rejected");
            None
        }
    }
}

/// Per-connection task. Frames are handled strictly in arrival order: the
/// next frame is not read until the previous response has been handed to
/// the writer, which is the session's back-pressure.
async fn handle_socket(socket: WebSocket, state: AppState, claims: Option<Claims>) {
    let mut session = Session::new(state.config.limits).with_claims(claims);
    let session_id = session.id.clone();
    state.registry.register(&session);
    if let Some(metrics) = &state.metrics {
        metrics.gauge_inc("ws.connections.active", &[], 1.0);
    }
    tracing::info!(session_id = %session_id, "mcp client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    // Writer task: forwards responses and keeps the connection warm with
    // periodic pings.
    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping.tick().await; // consume first immediate tick
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            WsMessage::Text(text) => {
                if let Some(reply) = process_frame(text.to_string(), &mut session, &state).await {
                    if tx.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    // Closing the channel lets the writer drain pending responses and exit.
    drop(tx);
    writer.await.ok();

    state.registry.unregister(&session_id);
    if let Some(metrics) = &state.metrics {
        metrics.gauge_inc("ws.connections.active", &[], -1.0);
    }
    tracing::info!(session_id = %session_id, "mcp client disconnected");
}

/// Handle one raw inbound frame: size gate, parse, dispatch. Returns the
/// serialized response, or None when no response is owed (notification).
async fn process_frame(raw: String, session: &mut Session, state: &AppState) -> Option<String> {
    if raw.len() > state.config.max_frame_bytes {
        if let Some(metrics) = &state.metrics {
            metrics.counter_inc("errors.total", &[("kind", "message_too_large")], 1);
        }
        tracing::warn!(
            session_id = %session.id,
            frame_bytes = raw.len(),
            "frame exceeds size limit"
        );
        let reply = McpMessage::error(None, McpError::message_too_large(state.config.max_frame_bytes));
        return serde_json::to_string(&reply).ok();
    }

    let msg: McpMessage = match serde_json::from_str(&raw) {
        Ok(msg) => msg,
        Err(_) => {
            if let Some(metrics) = &state.metrics {
                metrics.counter_inc("errors.total", &[("kind", "parse_error")], 1);
            }
            let reply = McpMessage::error(None, McpError::parse_error());
            return serde_json::to_string(&reply).ok();
        }
    };

    let reply = state.bridge.handle(msg, session).await?;
    serde_json::to_string(&reply).ok()
}
