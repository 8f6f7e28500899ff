use std::sync::Arc;

use serde_json::json;

use synapse_core::auth;
use synapse_routing::AgentBus;
use synapse_telemetry::MetricsRecorder;

use crate::catalog::{
    prompt_catalog, prompt_template, resource_catalog, tool_catalog, ToolName, SHARED_STATE_URI,
};
use crate::rpc::{self, McpError, McpMessage, Method};
use crate::session::Session;

/// Scope a caller must hold to invoke tools when authorization is enabled.
const TOOLS_CALL_SCOPE: &str = "tools:call";

/// Failure outcomes a handler can produce. These are values, not panics:
/// every variant maps to a protocol error response and the connection
/// always survives.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("{0}")]
    InvalidParams(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

impl BridgeError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotFound(_) => "method_not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal",
        }
    }

    fn into_mcp(self) -> McpError {
        match self {
            Self::MethodNotFound(method) => McpError::method_not_found(&method),
            Self::InvalidParams(msg) => McpError::invalid_params(msg),
            Self::Unauthorized(msg) => McpError::unauthorized(msg),
            Self::Internal(msg) => McpError::internal(msg),
        }
    }
}

/// Protocol dispatcher. Validates each inbound message, enforces the
/// per-session rate gate, and routes by method to the matching handler.
pub struct Bridge {
    bus: Arc<AgentBus>,
    metrics: Option<Arc<MetricsRecorder>>,
    auth_enabled: bool,
}

impl Bridge {
    pub fn new(bus: Arc<AgentBus>) -> Self {
        Self {
            bus,
            metrics: None,
            auth_enabled: false,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Require verified claims with the tools:call scope on tool calls.
    pub fn with_auth_required(mut self) -> Self {
        self.auth_enabled = true;
        self
    }

    /// Handle one inbound message. Returns None for notifications (absent
    /// id): they execute but receive no response, success or failure.
    pub async fn handle(&self, msg: McpMessage, session: &mut Session) -> Option<McpMessage> {
        let id = msg.id.filter(|v| !v.is_null());
        let started = std::time::Instant::now();

        let Some(method_str) = msg.method else {
            // A frame with neither method nor id is a stray response; drop it.
            return id.map(|id| McpMessage::error(Some(id), McpError::invalid_request()));
        };
        let params = msg.params.unwrap_or_else(|| json!({}));

        if let Some(metrics) = &self.metrics {
            metrics.counter_inc("mcp.requests.total", &[("method", method_str.as_str())], 1);
        }

        let method = Method::parse(&method_str);
        let outcome = if method == Some(Method::Initialize) {
            // The handshake is exempt from the rate gate and every other
            // precondition; it must always succeed.
            self.initialize(&params, session)
        } else {
            session.limiter.take(1).await;
            match method {
                Some(m) => self.dispatch(m, &params, session).await,
                None => Err(BridgeError::MethodNotFound(method_str.clone())),
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.histogram_observe(
                "mcp.request.duration_ms",
                &[("method", method_str.as_str())],
                started.elapsed().as_secs_f64() * 1000.0,
            );
        }

        match outcome {
            Ok(result) => id.map(|id| McpMessage::result(id, result)),
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    method = %method_str,
                    kind = e.kind(),
                    error = %e,
                    "request failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.counter_inc("errors.total", &[("kind", e.kind())], 1);
                }
                id.map(|id| McpMessage::error(Some(id), e.into_mcp()))
            }
        }
    }

    fn initialize(
        &self,
        params: &serde_json::Value,
        session: &mut Session,
    ) -> Result<serde_json::Value, BridgeError> {
        let client = params.get("clientInfo");
        session.client_name = client
            .and_then(|c| c.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        session.client_version = client
            .and_then(|c| c.get("version"))
            .and_then(|v| v.as_str())
            .unwrap_or("1.0")
            .to_string();

        tracing::info!(
            session_id = %session.id,
            client_name = %session.client_name,
            client_version = %session.client_version,
            "session negotiated"
        );

        Ok(json!({
            "protocolVersion": rpc::PROTOCOL_VERSION,
            "serverInfo": {
                "name": "synapse-bridge",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {"tools": {}, "resources": {}, "prompts": {}, "logging": {}}
        }))
    }

    async fn dispatch(
        &self,
        method: Method,
        params: &serde_json::Value,
        session: &Session,
    ) -> Result<serde_json::Value, BridgeError> {
        match method {
            Method::Initialize => unreachable!("initialize handled before the rate gate"),
            Method::ToolsList => Ok(json!({"tools": tool_catalog()})),
            Method::ToolsCall => self.tool_call(params, session).await,
            Method::ResourcesList => Ok(json!({"resources": resource_catalog()})),
            Method::ResourcesRead => self.resource_read(params).await,
            Method::PromptsList => Ok(json!({"prompts": prompt_catalog()})),
            Method::PromptsGet => {
                let name = rpc::require_str(params, "name").map_err(BridgeError::InvalidParams)?;
                prompt_template(name)
                    .ok_or_else(|| BridgeError::InvalidParams(format!("Unknown prompt: {name}")))
            }
        }
    }

    async fn tool_call(
        &self,
        params: &serde_json::Value,
        session: &Session,
    ) -> Result<serde_json::Value, BridgeError> {
        let name = rpc::require_str(params, "name").map_err(BridgeError::InvalidParams)?;
        let tool = ToolName::parse(name)
            .ok_or_else(|| BridgeError::InvalidParams(format!("Unknown tool: {name}")))?;

        if self.auth_enabled {
            let claims = session
                .claims
                .as_ref()
                .ok_or_else(|| BridgeError::Unauthorized("missing bearer token".to_string()))?;
            auth::require_scopes(claims, &[TOOLS_CALL_SCOPE])
                .map_err(|e| BridgeError::Unauthorized(e.to_string()))?;
        }

        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match tool {
            ToolName::RouteToAgent => {
                let message = rpc::str_or_empty(&args, "message");
                let capabilities = rpc::string_array(&args, "target_capabilities");
                let context = args.get("context").cloned().unwrap_or_else(|| json!({}));

                let outcome =
                    self.bus
                        .route_message(message, &capabilities, &context, &session.id);
                if let Some(metrics) = &self.metrics {
                    metrics.counter_inc("routing.success.total", &[], 1);
                }
                wrap_tool_result(&outcome)
            }
            ToolName::ShareContext => {
                let key = rpc::require_str(&args, "context_key")
                    .map_err(BridgeError::InvalidParams)?;
                let value = args.get("context_value").ok_or_else(|| {
                    BridgeError::InvalidParams("Missing required parameter: context_value".into())
                })?;
                let value_text = serde_json::to_string(value)
                    .map_err(|e| BridgeError::Internal(e.to_string()))?;

                let outcome = self
                    .bus
                    .share_context(key, &value_text, &session.id)
                    .await
                    .map_err(|e| BridgeError::Internal(e.to_string()))?;
                wrap_tool_result(&outcome)
            }
            ToolName::OrchestrateCollaboration => {
                let task = rpc::str_or_empty(&args, "task");
                let agents = rpc::string_array(&args, "agents");
                let outcome = self.bus.orchestrate_collaboration(task, &agents);
                wrap_tool_result(&outcome)
            }
        }
    }

    async fn resource_read(
        &self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        let uri = rpc::require_str(params, "uri").map_err(BridgeError::InvalidParams)?;
        if uri != SHARED_STATE_URI {
            return Err(BridgeError::InvalidParams(format!("Unknown resource: {uri}")));
        }
        let snapshot = self
            .bus
            .shared_snapshot()
            .await
            .map_err(|e| BridgeError::Internal(e.to_string()))?;
        let text =
            serde_json::to_string(&snapshot).map_err(|e| BridgeError::Internal(e.to_string()))?;
        Ok(json!({
            "contents": [{
                "uri": SHARED_STATE_URI,
                "mimeType": "application/json",
                "text": text,
            }]
        }))
    }
}

/// Wrap a tool outcome as protocol content: one text block carrying the
/// outcome serialized as JSON.
fn wrap_tool_result<T: serde::Serialize>(outcome: &T) -> Result<serde_json::Value, BridgeError> {
    let text = serde_json::to_string(outcome).map_err(|e| BridgeError::Internal(e.to_string()))?;
    Ok(json!({"content": [{"type": "text", "text": text}]}))
}
