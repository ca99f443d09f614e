use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One capability advertised by a tool server at `GET /mcp/v1/tools`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub tool_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: InputSchema,
    #[serde(default)]
    pub output_schema: Option<OutputSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A single input parameter. Compound types nest through `properties`/`items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ParameterSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
}

/// Informational only; never enforced against call results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

fn object_type() -> String {
    "object".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    pub tool_id: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Error,
}

/// Body returned by `POST /mcp/v1/tools/call`, on success and on structured errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallResponse {
    pub tool_id: String,
    pub status: CallStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Outcome of one wrapped tool execution as seen by agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: CallMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallMetadata {
    pub server_name: String,
    pub original_tool_id: String,
    pub server_url: String,
    pub execution_time_ms: f64,
    pub consecutive_failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_parameter_schema() {
        let raw = json!({
            "tool_id": "search",
            "name": "Search",
            "description": "Full text search",
            "input_schema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search terms", "required": true },
                    "filters": {
                        "type": "object",
                        "description": "Filters",
                        "properties": {
                            "tags": { "type": "array", "items": { "type": "string" } }
                        }
                    }
                },
                "required": ["query"]
            },
            "output_schema": { "type": "object" }
        });

        let def: ToolDefinition = serde_json::from_value(raw).unwrap();
        assert_eq!(def.tool_id, "search");
        let filters = &def.input_schema.properties["filters"];
        let tags = &filters.properties.as_ref().unwrap()["tags"];
        assert_eq!(tags.items.as_ref().unwrap().param_type, "string");
        assert!(def.input_schema.properties["query"].required);
    }

    #[test]
    fn missing_tool_id_is_rejected() {
        let raw = json!({ "name": "Search", "description": "no id" });
        assert!(serde_json::from_value::<ToolDefinition>(raw).is_err());
    }

    #[test]
    fn malformed_nested_schema_is_rejected() {
        let raw = json!({
            "tool_id": "t",
            "name": "T",
            "description": "d",
            "input_schema": { "properties": { "x": { "description": "missing type" } } }
        });
        assert!(serde_json::from_value::<ToolDefinition>(raw).is_err());
    }

    #[test]
    fn call_response_error_payload() {
        let raw = json!({ "tool_id": "t", "status": "error", "error_message": "bad input" });
        let resp: CallResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.status, CallStatus::Error);
        assert_eq!(resp.error_message.as_deref(), Some("bad input"));
    }
}
