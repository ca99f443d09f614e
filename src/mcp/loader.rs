//! Bounded-concurrency tool loading across every enabled server.
//!
//! One failing server never affects the others: timeouts, discovery errors
//! and even panics inside a server's task are tallied in [`LoadSummary`].

use crate::mcp::{
    client::McpClient,
    conflict::{ConflictPolicy, NameResolver, Resolution},
    discovery::{DiscoveryOptions, ToolCatalog},
    health::ServerStatus,
    wrapper::WrappedTool,
};
use crate::registry::{ServerRecord, ServerRegistry};
use futures::FutureExt;
use serde::Serialize;
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tokio::{sync::Semaphore, task::JoinSet};

pub const DEFAULT_MAX_CONCURRENT_SERVERS: usize = 5;
pub const DEFAULT_TIMEOUT_PER_SERVER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub conflict_resolution: ConflictPolicy,
    pub max_concurrent_servers: usize,
    pub timeout_per_server: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictPolicy::default(),
            max_concurrent_servers: DEFAULT_MAX_CONCURRENT_SERVERS,
            timeout_per_server: DEFAULT_TIMEOUT_PER_SERVER,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerFailure {
    pub server_name: String,
    pub server_url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub servers_total: usize,
    pub servers_successful: usize,
    pub servers_failed: usize,
    pub tools_loaded: usize,
    /// Malformed catalog entries plus tools dropped by conflict resolution.
    pub tools_skipped: usize,
    pub tools_replaced: usize,
    pub failures: Vec<ServerFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Completion order, not registry order.
    pub tools: Vec<Arc<WrappedTool>>,
    pub summary: LoadSummary,
}

enum ServerOutcome {
    Loaded {
        server: ServerRecord,
        catalog: ToolCatalog,
    },
    Failed {
        server: ServerRecord,
        status: ServerStatus,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ToolLoader {
    registry: Arc<dyn ServerRegistry>,
    client: Arc<McpClient>,
}

impl ToolLoader {
    pub fn new(registry: Arc<dyn ServerRegistry>, client: Arc<McpClient>) -> Self {
        Self { registry, client }
    }

    pub fn client(&self) -> &Arc<McpClient> {
        &self.client
    }

    pub async fn load_all_tools(&self, options: &LoadOptions) -> LoadOutcome {
        let servers = match self.registry.list_enabled_servers().await {
            Ok(servers) => servers,
            Err(err) => {
                tracing::error!(
                    name: "mcp.loader.registry_error",
                    error = %err,
                    "Failed to list servers"
                );
                return LoadOutcome {
                    tools: Vec::new(),
                    summary: LoadSummary {
                        registry_error: Some(err.to_string()),
                        ..LoadSummary::default()
                    },
                };
            }
        };

        let mut summary = LoadSummary {
            servers_total: servers.len(),
            ..LoadSummary::default()
        };

        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_servers.max(1)));
        let mut tasks = JoinSet::new();
        for server in servers {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let timeout = options.timeout_per_server;
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ServerOutcome::Failed {
                        server,
                        status: ServerStatus::Unknown,
                        reason: "loader shut down".to_string(),
                    };
                };
                guarded_discovery(client, server, timeout).await
            });
        }

        let mut resolver = NameResolver::new(options.conflict_resolution);
        let mut tools: Vec<Arc<WrappedTool>> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(
                        name: "mcp.loader.task_failed",
                        error = %err,
                        "Server task aborted"
                    );
                    summary.servers_failed += 1;
                    summary.failures.push(ServerFailure {
                        server_name: "<unknown>".to_string(),
                        server_url: String::new(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            match outcome {
                ServerOutcome::Loaded { server, catalog } => {
                    summary.servers_successful += 1;
                    summary.tools_skipped += catalog.rejected.len();
                    let snapshot = serde_json::to_value(&catalog.tools).ok();
                    self.record_status(&server, ServerStatus::Healthy, snapshot)
                        .await;

                    for definition in catalog.tools {
                        match resolver.resolve(&server.name, &definition.tool_id) {
                            Resolution::Admit(name) => {
                                tools.push(self.wrap(name, definition, &server));
                            }
                            Resolution::Replace(name) => {
                                if let Some(pos) =
                                    tools.iter().position(|t| t.effective_name() == name)
                                {
                                    tools.remove(pos);
                                    summary.tools_replaced += 1;
                                }
                                tools.push(self.wrap(name, definition, &server));
                            }
                            Resolution::Skip(_) => summary.tools_skipped += 1,
                        }
                    }
                }
                ServerOutcome::Failed {
                    server,
                    status,
                    reason,
                } => {
                    tracing::warn!(
                        name: "mcp.loader.server_failed",
                        server = %server.name,
                        server_url = %server.base_url,
                        reason = %reason,
                        "Server skipped during tool load"
                    );
                    summary.servers_failed += 1;
                    summary.failures.push(ServerFailure {
                        server_name: server.name.clone(),
                        server_url: server.base_url.clone(),
                        reason,
                    });
                    self.record_status(&server, status, None).await;
                }
            }
        }

        summary.tools_loaded = tools.len();
        tracing::info!(
            name: "mcp.loader.summary",
            servers_total = summary.servers_total,
            servers_successful = summary.servers_successful,
            servers_failed = summary.servers_failed,
            tools_loaded = summary.tools_loaded,
            tools_skipped = summary.tools_skipped,
            tools_replaced = summary.tools_replaced,
            policy = %options.conflict_resolution,
            "Tool load complete"
        );

        LoadOutcome { tools, summary }
    }

    fn wrap(
        &self,
        name: String,
        definition: crate::mcp::types::ToolDefinition,
        server: &ServerRecord,
    ) -> Arc<WrappedTool> {
        Arc::new(WrappedTool::new(
            name,
            definition,
            server,
            Some(Arc::clone(&self.client)),
        ))
    }

    async fn record_status(
        &self,
        server: &ServerRecord,
        status: ServerStatus,
        tools_snapshot: Option<serde_json::Value>,
    ) {
        if let Err(err) = self
            .registry
            .update_status(server.id, status, tools_snapshot)
            .await
        {
            tracing::warn!(
                server = %server.name,
                error = %err,
                "Failed to record server status"
            );
        }
    }
}

/// One server's discovery under its wall-clock budget. Panics are caught so
/// the failure can still be attributed to the server.
async fn guarded_discovery(
    client: Arc<McpClient>,
    server: ServerRecord,
    timeout: Duration,
) -> ServerOutcome {
    let options = DiscoveryOptions {
        max_retries: server.max_retries,
        retry_base_delay: client.settings().retry_base_delay,
        request_timeout: server.timeout(),
    };
    let discovery = client.discover_catalog(&server.base_url, Some(server.auth.clone()), &options);
    let result = AssertUnwindSafe(tokio::time::timeout(timeout, discovery))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(Ok(catalog))) => ServerOutcome::Loaded { server, catalog },
        Ok(Ok(Err(err))) => ServerOutcome::Failed {
            server,
            status: ServerStatus::Unhealthy,
            reason: err.to_string(),
        },
        Ok(Err(_elapsed)) => ServerOutcome::Failed {
            reason: format!("discovery timed out after {:.1}s", timeout.as_secs_f64()),
            server,
            status: ServerStatus::Timeout,
        },
        Err(_panic) => ServerOutcome::Failed {
            server,
            status: ServerStatus::Unknown,
            reason: "discovery task panicked".to_string(),
        },
    }
}
