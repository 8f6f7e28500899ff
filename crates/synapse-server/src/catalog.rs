use serde::Serialize;
use serde_json::json;

/// URI of the single exposed resource: the shared-state snapshot.
pub const SHARED_STATE_URI: &str = "synapse://shared-state";

/// Closed set of callable tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolName {
    RouteToAgent,
    ShareContext,
    OrchestrateCollaboration,
}

impl ToolName {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "route_to_agent" => Some(Self::RouteToAgent),
            "share_context" => Some(Self::ShareContext),
            "orchestrate_collaboration" => Some(Self::OrchestrateCollaboration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteToAgent => "route_to_agent",
            Self::ShareContext => "share_context",
            Self::OrchestrateCollaboration => "orchestrate_collaboration",
        }
    }
}

/// Tool descriptor advertised by `tools/list`.
#[derive(Clone, Debug, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

pub fn tool_catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ToolName::RouteToAgent.as_str(),
            description: "Route a message to the optimal AI agent",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "target_capabilities": {"type": "array", "items": {"type": "string"}},
                    "context": {"type": "object"}
                },
                "required": ["message"]
            }),
        },
        ToolSpec {
            name: ToolName::ShareContext.as_str(),
            description: "Share context across agents (SSoT)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context_key": {"type": "string"},
                    "context_value": {
                        "oneOf": [
                            {"type": "object"}, {"type": "string"},
                            {"type": "number"}, {"type": "boolean"},
                            {"type": "array"}, {"type": "null"}
                        ]
                    }
                },
                "required": ["context_key", "context_value"]
            }),
        },
        ToolSpec {
            name: ToolName::OrchestrateCollaboration.as_str(),
            description: "Orchestrate multi-agent collaboration",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task": {"type": "string"},
                    "agents": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["task"]
            }),
        },
    ]
}

pub fn resource_catalog() -> serde_json::Value {
    json!([{
        "uri": SHARED_STATE_URI,
        "name": "Shared State",
        "description": "SSoT snapshot",
        "mimeType": "application/json"
    }])
}

pub fn prompt_catalog() -> serde_json::Value {
    json!([
        {"name": "analyze_task", "description": "Analyze a task for optimal routing"},
        {"name": "collaboration_request", "description": "Ask agents to collaborate"}
    ])
}

/// Full template for a named prompt, or None when unknown.
pub fn prompt_template(name: &str) -> Option<serde_json::Value> {
    match name {
        "analyze_task" => Some(json!({
            "name": "analyze_task",
            "description": "Analyze a task for optimal agent routing",
            "arguments": [{"name": "task", "description": "The task", "required": true}],
            "messages": [{
                "role": "user",
                "content": "Analyze this task and determine best agent(s): {{task}}"
            }]
        })),
        "collaboration_request" => Some(json!({
            "name": "collaboration_request",
            "description": "Orchestrate collaboration",
            "arguments": [
                {"name": "task", "required": true},
                {"name": "agents", "required": false}
            ],
            "messages": [{
                "role": "user",
                "content": "Coordinate {{agents}} to complete: {{task}}"
            }]
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_name_roundtrip() {
        for tool in [
            ToolName::RouteToAgent,
            ToolName::ShareContext,
            ToolName::OrchestrateCollaboration,
        ] {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::parse("nonexistent"), None);
    }

    #[test]
    fn catalog_declares_three_tools_with_schemas() {
        let tools = tool_catalog();
        assert_eq!(tools.len(), 3);
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object");
            assert!(tool.input_schema["required"].is_array());
        }
        assert_eq!(tools[0].name, "route_to_agent");
        assert_eq!(
            tools[0].input_schema["required"],
            serde_json::json!(["message"])
        );
    }

    #[test]
    fn tool_spec_serializes_camel_case_schema_key() {
        let tools = tool_catalog();
        let value = serde_json::to_value(&tools[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn single_resource_descriptor() {
        let resources = resource_catalog();
        assert_eq!(resources.as_array().unwrap().len(), 1);
        assert_eq!(resources[0]["uri"], SHARED_STATE_URI);
        assert_eq!(resources[0]["mimeType"], "application/json");
    }

    #[test]
    fn prompt_templates_cover_the_catalog() {
        for entry in prompt_catalog().as_array().unwrap() {
            let name = entry["name"].as_str().unwrap();
            let template = prompt_template(name).unwrap();
            assert_eq!(template["name"], name);
            assert!(template["messages"].is_array());
        }
        assert!(prompt_template("nonexistent").is_none());
    }
}
