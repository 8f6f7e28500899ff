use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use synapse_telemetry::MetricsRecorder;

use crate::session::SessionRegistry;

/// State for the plain-HTTP collaborator surface. Deliberately decoupled
/// from the protocol transport: liveness checks must answer even when the
/// bridge is busy.
#[derive(Clone)]
pub struct HttpState {
    pub registry: Arc<SessionRegistry>,
    pub metrics: Option<Arc<MetricsRecorder>>,
}

pub fn build_http_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind and serve the health/readiness/metrics endpoints on their own port.
pub async fn start_http(
    host: &str,
    port: u16,
    state: HttpState,
) -> Result<HttpHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let local_addr = listener.local_addr()?;
    let router = build_http_router(state);

    tracing::info!(port = local_addr.port(), "http collaborator listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(HttpHandle {
        port: local_addr.port(),
        _server: server,
    })
}

pub struct HttpHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    count_request(&state, "/health");
    Json(json!({"status": "ok"}))
}

async fn ready(State(state): State<HttpState>) -> impl IntoResponse {
    count_request(&state, "/ready");
    Json(json!({
        "status": "ready",
        "active_sessions": state.registry.count(),
    }))
}

async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    count_request(&state, "/metrics");
    let payload = state
        .metrics
        .as_ref()
        .map(|m| m.export())
        .unwrap_or_else(|| json!({}));
    Json(payload)
}

fn count_request(state: &HttpState, path: &str) {
    if let Some(metrics) = &state.metrics {
        metrics.counter_inc("http.requests.total", &[("path", path)], 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_state() -> HttpState {
        HttpState {
            registry: Arc::new(SessionRegistry::new()),
            metrics: Some(Arc::new(MetricsRecorder::new())),
        }
    }

    #[tokio::test]
    async fn health_and_ready_respond() {
        let state = http_state();
        let handle = start_http("127.0.0.1", 0, state.clone()).await.unwrap();

        let base = format!("http://127.0.0.1:{}", handle.port);

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        let resp = reqwest::get(format!("{base}/ready")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn metrics_endpoint_exports_counters() {
        let state = http_state();
        state
            .metrics
            .as_ref()
            .unwrap()
            .counter_inc("routing.success.total", &[], 5);

        let handle = start_http("127.0.0.1", 0, state).await.unwrap();
        let url = format!("http://127.0.0.1:{}/metrics", handle.port);
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["counters"]["routing.success.total"], 5);
    }

    #[tokio::test]
    async fn metrics_endpoint_without_recorder_is_empty() {
        let state = HttpState {
            registry: Arc::new(SessionRegistry::new()),
            metrics: None,
        };
        let handle = start_http("127.0.0.1", 0, state).await.unwrap();
        let url = format!("http://127.0.0.1:{}/metrics", handle.port);
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert!(body.as_object().unwrap().is_empty());
    }
}
