//! Tool table: every capability agents can call, keyed by a stable name.
//!
//! Native tools are registered once at startup. Remote tools come from the
//! latest [`crate::mcp::LoadOutcome`] and are swapped wholesale on reload.

use crate::mcp::{
    error::ToolError,
    types::{CallMetadata, CallResult},
    wrapper::{ToolCapabilities, WrappedTool},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc, time::Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait NativeTool: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;
    async fn call(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

#[derive(Debug, Clone)]
pub enum Capability {
    Native(Arc<dyn NativeTool>),
    Remote(Arc<WrappedTool>),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Native,
    Remote,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub kind: CapabilityKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ToolCapabilities>,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct ToolTable {
    entries: RwLock<BTreeMap<String, Capability>>,
}

impl ToolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize tool names for `OpenAI` function-calling compatibility.
    pub fn sanitize_tool_name(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    pub async fn register_native(&self, tool: Arc<dyn NativeTool>) -> String {
        let key = Self::sanitize_tool_name(tool.name());
        self.entries
            .write()
            .await
            .insert(key.clone(), Capability::Native(tool));
        key
    }

    /// Drop all remote entries and install `tools`. Native tools win name
    /// clashes. Returns the number of remote tools installed.
    pub async fn replace_remote(&self, tools: Vec<Arc<WrappedTool>>) -> usize {
        let mut entries = self.entries.write().await;
        entries.retain(|_, cap| matches!(cap, Capability::Native(_)));

        let mut installed = 0;
        for tool in tools {
            let key = Self::sanitize_tool_name(tool.effective_name());
            if matches!(entries.get(&key), Some(Capability::Native(_))) {
                tracing::warn!(tool = %key, "Remote tool shadowed by native tool, ignoring");
                continue;
            }
            if entries.insert(key.clone(), Capability::Remote(tool)).is_none() {
                installed += 1;
            } else {
                tracing::warn!(tool = %key, "Duplicate remote tool name, keeping latest");
            }
        }
        installed
    }

    pub async fn get(&self, name: &str) -> Option<Capability> {
        self.entries.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn list(&self) -> Vec<CapabilityDescriptor> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, cap)| describe(name, cap))
            .collect()
    }

    /// Tool list in the `OpenAI` function-calling shape.
    pub async fn function_specs(&self) -> Vec<serde_json::Value> {
        self.list()
            .await
            .into_iter()
            .map(|d| {
                json!({
                    "type": "function",
                    "function": {
                        "name": d.name,
                        "description": d.description,
                        "parameters": d.input_schema,
                    }
                })
            })
            .collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        parameters: serde_json::Value,
    ) -> Result<CallResult, ToolError> {
        let capability = self.get(name).await.ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        match capability {
            Capability::Remote(tool) => tool.execute(tool.effective_name(), parameters).await,
            Capability::Native(tool) => {
                let started = Instant::now();
                let data = tool.call(parameters).await.map_err(|e| ToolError::Native {
                    tool: name.to_string(),
                    message: format!("{e:#}"),
                })?;
                Ok(CallResult {
                    success: true,
                    data: Some(data),
                    error: None,
                    metadata: CallMetadata {
                        server_name: "native".to_string(),
                        original_tool_id: tool.name().to_string(),
                        server_url: String::new(),
                        execution_time_ms: crate::mcp::client::elapsed_ms(started),
                        consecutive_failures: 0,
                    },
                })
            }
        }
    }
}

fn describe(name: &str, capability: &Capability) -> CapabilityDescriptor {
    match capability {
        Capability::Native(tool) => CapabilityDescriptor {
            name: name.to_string(),
            kind: CapabilityKind::Native,
            description: tool.description().to_string(),
            server_name: None,
            capabilities: None,
            input_schema: tool.schema(),
        },
        Capability::Remote(tool) => CapabilityDescriptor {
            name: name.to_string(),
            kind: CapabilityKind::Remote,
            description: tool.definition().description.clone(),
            server_name: Some(tool.origin().server_name.clone()),
            capabilities: Some(tool.get_capabilities().clone()),
            input_schema: serde_json::to_value(&tool.definition().input_schema)
                .unwrap_or_else(|_| json!({"type": "object", "properties": {}})),
        },
    }
}

/// Returns its arguments unchanged.
#[derive(Debug, Default)]
pub struct EchoTool;

#[async_trait]
impl NativeTool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Returns the input back to you"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "Text to echo" }
            }
        })
    }

    async fn call(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServerRecord;

    fn remote(name: &str) -> Arc<WrappedTool> {
        let definition = serde_json::from_value(json!({
            "tool_id": name,
            "name": name,
            "description": "remote tool"
        }))
        .unwrap();
        Arc::new(WrappedTool::new(
            name,
            definition,
            &ServerRecord::new("srv", "http://srv"),
            None,
        ))
    }

    #[tokio::test]
    async fn echo_round_trips_arguments() {
        let table = ToolTable::new();
        table.register_native(Arc::new(EchoTool)).await;
        let result = table.execute("echo", json!({"message": "hi"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"message": "hi"})));
        assert_eq!(result.metadata.server_name, "native");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let table = ToolTable::new();
        let err = table.execute("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn reload_replaces_only_remote_entries() {
        let table = ToolTable::new();
        table.register_native(Arc::new(EchoTool)).await;

        assert_eq!(table.replace_remote(vec![remote("a"), remote("b")]).await, 2);
        assert_eq!(table.len().await, 3);

        assert_eq!(table.replace_remote(vec![remote("c"), remote("echo")]).await, 1);
        assert_eq!(table.len().await, 2);
        assert!(matches!(table.get("echo").await, Some(Capability::Native(_))));
        assert!(table.get("a").await.is_none());
    }

    #[tokio::test]
    async fn function_specs_use_sanitized_names() {
        let table = ToolTable::new();
        table.replace_remote(vec![remote("docs.search")]).await;
        let specs = table.function_specs().await;
        assert_eq!(specs[0]["function"]["name"], "docs_search");
        assert_eq!(specs[0]["function"]["parameters"]["type"], "object");
    }
}
