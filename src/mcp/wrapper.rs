use crate::mcp::{
    client::{McpClient, elapsed_ms, normalize_base_url},
    error::{ToolError, ToolErrorDetails},
    health::HealthStatus,
    types::{CallMetadata, CallResult, CallStatus, ToolDefinition},
};
use crate::registry::ServerRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolOrigin {
    pub server_name: String,
    pub server_base_url: String,
    pub original_tool_id: String,
}

/// Parameter summary handed to agents.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolCapabilities {
    pub name: String,
    pub description: String,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    /// `"(type) description"` per input parameter.
    pub properties: BTreeMap<String, String>,
}

impl ToolCapabilities {
    fn describe(effective_name: &str, definition: &ToolDefinition) -> Self {
        let schema = &definition.input_schema;
        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut properties = BTreeMap::new();

        for (name, param) in &schema.properties {
            if param.required || schema.required.contains(name) {
                required.push(name.clone());
            } else {
                optional.push(name.clone());
            }
            properties.insert(
                name.clone(),
                format!("({}) {}", param.param_type, param.description),
            );
        }

        Self {
            name: effective_name.to_string(),
            description: definition.description.clone(),
            required,
            optional,
            properties,
        }
    }
}

#[derive(Debug, Default)]
struct CallState {
    consecutive_failures: u32,
    last_health_check: Option<DateTime<Utc>>,
}

/// A remote tool exposed to agents under a conflict-resolved name.
///
/// Built fresh on every load; failure counters here are local to the tool and
/// separate from the server-wide counters in the client's health registry.
pub struct WrappedTool {
    effective_name: String,
    definition: ToolDefinition,
    origin: ToolOrigin,
    capabilities: ToolCapabilities,
    health_check_interval: Duration,
    client: Option<Arc<McpClient>>,
    state: Mutex<CallState>,
}

impl std::fmt::Debug for WrappedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappedTool")
            .field("effective_name", &self.effective_name)
            .field("origin", &self.origin)
            .field("has_client", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl WrappedTool {
    pub fn new(
        effective_name: impl Into<String>,
        definition: ToolDefinition,
        server: &ServerRecord,
        client: Option<Arc<McpClient>>,
    ) -> Self {
        let effective_name = effective_name.into();
        let capabilities = ToolCapabilities::describe(&effective_name, &definition);
        Self {
            origin: ToolOrigin {
                server_name: server.name.clone(),
                server_base_url: normalize_base_url(&server.base_url),
                original_tool_id: definition.tool_id.clone(),
            },
            effective_name,
            definition,
            capabilities,
            health_check_interval: server.health_check_interval(),
            client,
            state: Mutex::new(CallState::default()),
        }
    }

    pub fn effective_name(&self) -> &str {
        &self.effective_name
    }

    pub fn origin(&self) -> &ToolOrigin {
        &self.origin
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn get_capabilities(&self) -> &ToolCapabilities {
        &self.capabilities
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock_state().consecutive_failures
    }

    pub fn last_health_check(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_health_check
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CallState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke the remote tool.
    ///
    /// A remote tool reporting `status: "error"` yields `Ok` with
    /// `success == false`; only local refusals and transport or protocol
    /// failures produce a [`ToolError`].
    pub async fn execute(
        &self,
        action: &str,
        parameters: serde_json::Value,
    ) -> Result<CallResult, ToolError> {
        if action != self.effective_name && action != self.origin.original_tool_id {
            tracing::warn!(
                name: "mcp.tool.action_mismatch",
                tool = %self.effective_name,
                action = %action,
                "Action does not match tool name, executing anyway"
            );
        }

        let Some(client) = self.client.as_deref() else {
            return Err(ToolError::Unavailable {
                tool: self.effective_name.clone(),
            });
        };

        let health = self.pre_check(client).await;
        if health.is_circuit_open() {
            tracing::warn!(
                name: "mcp.tool.circuit_open",
                tool = %self.effective_name,
                server = %self.origin.server_name,
                consecutive_failures = health.consecutive_failures,
                "Refusing tool call, server circuit is open"
            );
            return Err(ToolError::CircuitOpen {
                server_name: self.origin.server_name.clone(),
                server_url: self.origin.server_base_url.clone(),
                consecutive_failures: health.consecutive_failures,
            });
        }

        // Covers the remote call only, not the health pre-check.
        let started = Instant::now();
        let outcome = client
            .call_tool(
                &self.origin.server_base_url,
                &self.origin.original_tool_id,
                parameters,
            )
            .await;
        let execution_time_ms = elapsed_ms(started);

        match outcome {
            Ok(response) if response.status == CallStatus::Success => {
                let failures = {
                    let mut state = self.lock_state();
                    state.consecutive_failures = 0;
                    state.last_health_check = Some(Utc::now());
                    state.consecutive_failures
                };
                tracing::info!(
                    name: "mcp.tool.executed",
                    tool = %self.effective_name,
                    server = %self.origin.server_name,
                    execution_time_ms = execution_time_ms,
                    "Tool call succeeded"
                );
                Ok(CallResult {
                    success: true,
                    data: response.result,
                    error: None,
                    metadata: self.metadata(execution_time_ms, failures),
                })
            }
            Ok(response) => {
                let failures = self.bump_failures();
                tracing::warn!(
                    name: "mcp.tool.reported_error",
                    tool = %self.effective_name,
                    server = %self.origin.server_name,
                    error = ?response.error_message,
                    consecutive_failures = failures,
                    "Remote tool reported an error"
                );
                Ok(CallResult {
                    success: false,
                    data: response.result,
                    error: Some(
                        response
                            .error_message
                            .unwrap_or_else(|| "remote tool reported an error".to_string()),
                    ),
                    metadata: self.metadata(execution_time_ms, failures),
                })
            }
            Err(source) => {
                let failures = self.bump_failures();
                let details = ToolErrorDetails {
                    server_name: self.origin.server_name.clone(),
                    original_tool_id: self.origin.original_tool_id.clone(),
                    server_url: self.origin.server_base_url.clone(),
                    consecutive_failures: failures,
                    execution_time_ms,
                    error_type: source.kind().to_string(),
                };
                tracing::error!(
                    name: "mcp.tool.failed",
                    tool = %self.effective_name,
                    server = %self.origin.server_name,
                    error = %source,
                    consecutive_failures = failures,
                    "Tool call failed"
                );
                Err(ToolError::Execution {
                    tool: self.effective_name.clone(),
                    details,
                    source,
                })
            }
        }
    }

    /// Stored server health, re-probed when missing or older than the
    /// server's health check interval.
    async fn pre_check(&self, client: &McpClient) -> HealthStatus {
        match client.health().snapshot(&self.origin.server_base_url) {
            Some(snapshot) if !snapshot.is_stale(self.health_check_interval) => snapshot,
            _ => client.check_health(&self.origin.server_base_url).await,
        }
    }

    fn bump_failures(&self) -> u32 {
        let mut state = self.lock_state();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.consecutive_failures
    }

    fn metadata(&self, execution_time_ms: f64, consecutive_failures: u32) -> CallMetadata {
        CallMetadata {
            server_name: self.origin.server_name.clone(),
            original_tool_id: self.origin.original_tool_id.clone(),
            server_url: self.origin.server_base_url.clone(),
            execution_time_ms,
            consecutive_failures,
        }
    }
}
