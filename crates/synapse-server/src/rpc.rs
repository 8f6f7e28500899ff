use serde::{Deserialize, Serialize};

/// Protocol revision advertised in the handshake.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

// Protocol-level error codes carried in `error.code`.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const MESSAGE_TOO_LARGE: i32 = -32000;
pub const UNAUTHORIZED: i32 = -32001;

/// Wire envelope. One complete serialized message per transport frame, for
/// requests, notifications, and responses alike. A response carries at most
/// one of `result` / `error`; the constructors below keep that invariant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct McpMessage {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

/// Error object embedded in an error response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl McpMessage {
    /// Success response correlated to `id`.
    pub fn result(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Error response. `id` is absent only for frames whose id could not be
    /// recovered (oversize, unparseable).
    pub fn error(id: Option<serde_json::Value>, error: McpError) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }
}

impl McpError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, msg)
    }

    pub fn message_too_large(limit: usize) -> Self {
        Self::new(MESSAGE_TOO_LARGE, format!("Message exceeds {limit} bytes"))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(UNAUTHORIZED, msg)
    }
}

/// Closed set of protocol methods. Dispatch matches on this enum, so adding
/// a method is a compile-time-checked change rather than a string chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
    PromptsList,
    PromptsGet,
}

impl Method {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initialize" => Some(Self::Initialize),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            "resources/list" => Some(Self::ResourcesList),
            "resources/read" => Some(Self::ResourcesRead),
            "prompts/list" => Some(Self::PromptsList),
            "prompts/get" => Some(Self::PromptsGet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::ResourcesList => "resources/list",
            Self::ResourcesRead => "resources/read",
            Self::PromptsList => "prompts/list",
            Self::PromptsGet => "prompts/get",
        }
    }
}

/// Extract a required string param.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

/// Extract an optional string param, defaulting to empty.
pub fn str_or_empty<'a>(params: &'a serde_json::Value, key: &str) -> &'a str {
    params.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Extract an optional array of strings, defaulting to empty.
pub fn string_array(params: &serde_json::Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_request_envelope() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"route_to_agent","arguments":{"message":"hi"}}}"#;
        let msg: McpMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.jsonrpc, "2.0");
        assert_eq!(msg.id, Some(json!(1)));
        assert_eq!(msg.method.as_deref(), Some("tools/call"));
        assert!(msg.params.is_some());
        assert!(msg.result.is_none());
        assert!(msg.error.is_none());
    }

    #[test]
    fn envelope_accepts_string_ids() {
        let raw = r#"{"jsonrpc":"2.0","id":"req-7","method":"tools/list"}"#;
        let msg: McpMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, Some(json!("req-7")));
    }

    #[test]
    fn missing_jsonrpc_defaults() {
        let raw = r#"{"id":1,"method":"tools/list"}"#;
        let msg: McpMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.jsonrpc, "2.0");
    }

    #[test]
    fn result_response_omits_error() {
        let resp = McpMessage::result(json!(1), json!({"ok": true}));
        let raw = serde_json::to_string(&resp).unwrap();
        assert!(raw.contains("\"result\""));
        assert!(!raw.contains("\"error\""));
        assert!(!raw.contains("\"method\""));
    }

    #[test]
    fn error_response_omits_result() {
        let resp = McpMessage::error(Some(json!("req-7")), McpError::method_not_found("nope"));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["id"], "req-7");
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn error_without_id_omits_field() {
        let resp = McpMessage::error(None, McpError::parse_error());
        let raw = serde_json::to_string(&resp).unwrap();
        assert!(!raw.contains("\"id\""));
        assert!(raw.contains("-32700"));
    }

    #[test]
    fn method_parse_roundtrip() {
        for method in [
            Method::Initialize,
            Method::ToolsList,
            Method::ToolsCall,
            Method::ResourcesList,
            Method::ResourcesRead,
            Method::PromptsList,
            Method::PromptsGet,
        ] {
            assert_eq!(Method::parse(method.as_str()), Some(method));
        }
        assert_eq!(Method::parse("agent.message"), None);
    }

    #[test]
    fn require_str_extracts() {
        let params = json!({"name": "test", "count": 5});
        assert_eq!(require_str(&params, "name").unwrap(), "test");
        assert!(require_str(&params, "missing").is_err());
        assert!(require_str(&params, "count").is_err()); // not a string
    }

    #[test]
    fn string_array_filters_non_strings() {
        let params = json!({"tags": ["a", 1, "b", null]});
        assert_eq!(string_array(&params, "tags"), vec!["a", "b"]);
        assert!(string_array(&params, "missing").is_empty());
    }

    #[test]
    fn str_or_empty_defaults() {
        let params = json!({"message": "hello"});
        assert_eq!(str_or_empty(&params, "message"), "hello");
        assert_eq!(str_or_empty(&params, "absent"), "");
    }
}
