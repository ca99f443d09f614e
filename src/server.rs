use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::{AppConfig, duration_from_secs_f64};
use crate::mcp::{
    ConflictPolicy, HealthStatus, LoadSummary, McpClient, ToolError, ToolLoader,
    monitor::spawn_health_monitor, types::CallResult,
};
use crate::registry::{InMemoryServerRegistry, ServerRecord, ServerRegistry, load_servers_file};
use crate::tools::{CapabilityDescriptor, EchoTool, ToolTable};

/// Wire up the core, run the first tool load and serve until Ctrl-C.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let servers = match load_servers_file(&config.mcp.servers_file) {
        Ok(servers) => servers,
        Err(e) => {
            tracing::warn!(
                path = %config.mcp.servers_file,
                error = %format!("{e:#}"),
                "No tool servers loaded"
            );
            Vec::new()
        }
    };
    let registry: Arc<dyn ServerRegistry> = Arc::new(InMemoryServerRegistry::new(servers)?);
    let client = Arc::new(McpClient::new(config.mcp.client_settings())?);
    let loader = Arc::new(ToolLoader::new(Arc::clone(&registry), Arc::clone(&client)));

    let tools = Arc::new(ToolTable::new());
    tools.register_native(Arc::new(EchoTool)).await;

    let outcome = loader.load_all_tools(&config.mcp.load_options()).await;
    tools.replace_remote(outcome.tools).await;
    for tool in tools.list().await {
        info!(name: "mcp.tool.discovered", tool = %tool.name, kind = ?tool.kind, "Tool available");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = (config.mcp.monitor_tick_secs > 0).then(|| {
        spawn_health_monitor(
            Arc::clone(&registry),
            Arc::clone(&client),
            Duration::from_secs(config.mcp.monitor_tick_secs),
            shutdown_rx,
        )
    });

    let state = AppState {
        registry,
        client,
        loader,
        tools,
        config: Arc::clone(&config),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(name: "server.started", address = %addr, "Server started");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(monitor) = monitor {
        monitor.await?;
    }
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/servers", get(api_list_servers))
        .route("/api/servers/{name}/health", get(api_server_health))
        .route("/api/health", get(api_health_snapshots))
        .route("/api/tools", get(api_list_tools))
        .route("/api/tools/reload", post(api_reload_tools))
        .route("/api/tools/{name}/execute", post(api_execute_tool))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

type ApiError = (StatusCode, Json<serde_json::Value>);

fn internal_error(err: &anyhow::Error) -> ApiError {
    tracing::error!(error = %format!("{err:#}"), "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

/// GET /api/servers - List registered tool servers.
async fn api_list_servers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServerRecord>>, ApiError> {
    let mut servers = state
        .registry
        .list_servers()
        .await
        .map_err(|e| internal_error(&e))?;
    for server in &mut servers {
        server.auth = crate::mcp::auth::AuthConfig::None;
    }
    Ok(Json(servers))
}

/// GET /api/servers/{name}/health - Probe one server now.
async fn api_server_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<HealthStatus>, ApiError> {
    let server = state
        .registry
        .get_server(&name)
        .await
        .map_err(|e| internal_error(&e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown server '{name}'") })),
            )
        })?;

    state.client.set_auth(&server.base_url, server.auth.clone());
    let status = state.client.check_health(&server.base_url).await;
    if let Err(e) = state
        .registry
        .update_status(server.id, status.status, None)
        .await
    {
        tracing::warn!(server = %name, error = %e, "Failed to record health status");
    }
    Ok(Json(status))
}

/// GET /api/health - Latest health snapshot per server URL.
async fn api_health_snapshots(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, HealthStatus>> {
    Json(state.client.health().all())
}

/// GET /api/tools - Capability descriptors for every callable tool.
async fn api_list_tools(State(state): State<AppState>) -> Json<Vec<CapabilityDescriptor>> {
    Json(state.tools.list().await)
}

#[derive(Debug, Default, Deserialize)]
struct ReloadRequest {
    #[serde(default)]
    conflict_resolution: Option<ConflictPolicy>,
    #[serde(default)]
    max_concurrent_servers: Option<usize>,
    #[serde(default)]
    timeout_per_server_secs: Option<f64>,
}

/// POST /api/tools/reload - Rediscover tools from every enabled server.
async fn api_reload_tools(
    State(state): State<AppState>,
    body: Option<Json<ReloadRequest>>,
) -> Json<LoadSummary> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut options = state.config.mcp.load_options();
    if let Some(policy) = req.conflict_resolution {
        options.conflict_resolution = policy;
    }
    if let Some(max) = req.max_concurrent_servers {
        options.max_concurrent_servers = max;
    }
    if let Some(secs) = req.timeout_per_server_secs {
        options.timeout_per_server = duration_from_secs_f64(secs);
    }

    let outcome = state.loader.load_all_tools(&options).await;
    state.tools.replace_remote(outcome.tools).await;
    Json(outcome.summary)
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    parameters: serde_json::Value,
}

/// POST /api/tools/{name}/execute - Run one tool.
async fn api_execute_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<Json<CallResult>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let parameters = if req.parameters.is_null() {
        json!({})
    } else {
        req.parameters
    };

    state
        .tools
        .execute(&name, parameters)
        .await
        .map(Json)
        .map_err(|e| tool_error_response(&e))
}

fn tool_error_response(err: &ToolError) -> ApiError {
    let status = match err {
        ToolError::UnknownTool { .. } => StatusCode::NOT_FOUND,
        ToolError::CircuitOpen { .. } | ToolError::Unavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ToolError::Execution { .. } | ToolError::Native { .. } => StatusCode::BAD_GATEWAY,
    };
    let mut body = json!({ "error": err.to_string() });
    if let Some(details) = err.details() {
        body["details"] = serde_json::to_value(details).unwrap_or_default();
    }
    (status, Json(body))
}
