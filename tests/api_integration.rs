mod common;

use agent_gateway::{
    AppState,
    config::AppConfig,
    mcp::ToolLoader,
    registry::{InMemoryServerRegistry, ServerRecord, ServerRegistry},
    server::build_router,
    tools::{EchoTool, ToolTable},
};
use axum::http::StatusCode;
use axum_test::TestServer;
use common::{MockToolServer, dead_url, fast_client, tool};
use serde_json::{Value, json};
use std::sync::Arc;

async fn gateway(servers: Vec<ServerRecord>) -> TestServer {
    let registry: Arc<dyn ServerRegistry> =
        Arc::new(InMemoryServerRegistry::new(servers).unwrap());
    let client = fast_client();
    let loader = Arc::new(ToolLoader::new(Arc::clone(&registry), Arc::clone(&client)));
    let tools = Arc::new(ToolTable::new());
    tools.register_native(Arc::new(EchoTool)).await;

    let config = Arc::new(AppConfig::load_from_args(["agent-gateway"]).unwrap());
    let state = AppState {
        registry,
        client,
        loader,
        tools,
        config,
    };
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn liveness() {
    let server = gateway(Vec::new()).await;
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn reload_then_list_and_execute() {
    let (url, hits) = MockToolServer::with_catalog(json!([tool("search")]))
        .spawn()
        .await;
    let server = gateway(vec![ServerRecord::new("alpha", &url)]).await;

    let tools: Vec<Value> = server.get("/api/tools").await.json();
    assert_eq!(tools.len(), 1, "only the native echo tool before reload");

    let summary: Value = server.post("/api/tools/reload").await.json();
    assert_eq!(summary["servers_successful"], 1);
    assert_eq!(summary["tools_loaded"], 1);

    let tools: Vec<Value> = server.get("/api/tools").await.json();
    let remote = tools
        .iter()
        .find(|t| t["name"] == "alpha_search")
        .expect("remote tool listed");
    assert_eq!(remote["kind"], "remote");
    assert_eq!(remote["server_name"], "alpha");
    assert_eq!(remote["capabilities"]["required"], json!(["query"]));

    let response = server
        .post("/api/tools/alpha_search/execute")
        .json(&json!({ "parameters": { "query": "rust" } }))
        .await;
    response.assert_status_ok();
    let result: Value = response.json();
    assert_eq!(result["success"], true);
    assert_eq!(result["data"], json!({ "query": "rust" }));
    assert_eq!(hits.calls(), 1);
}

#[tokio::test]
async fn reload_accepts_policy_override() {
    let (a, _) = MockToolServer::with_catalog(json!([tool("search")])).spawn().await;
    let (b, _) = MockToolServer::with_catalog(json!([tool("search")])).spawn().await;
    let server = gateway(vec![
        ServerRecord::new("alpha", &a),
        ServerRecord::new("beta", &b),
    ])
    .await;

    let summary: Value = server
        .post("/api/tools/reload")
        .json(&json!({ "conflict_resolution": "skip" }))
        .await
        .json();
    assert_eq!(summary["tools_loaded"], 1);
    assert_eq!(summary["tools_skipped"], 1);

    let tools: Vec<Value> = server.get("/api/tools").await.json();
    assert!(tools.iter().any(|t| t["name"] == "search"));
}

#[tokio::test]
async fn execute_native_echo() {
    let server = gateway(Vec::new()).await;
    let result: Value = server
        .post("/api/tools/echo/execute")
        .json(&json!({ "parameters": { "message": "hi" } }))
        .await
        .json();
    assert_eq!(result["data"], json!({ "message": "hi" }));
    assert_eq!(result["metadata"]["server_name"], "native");
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let server = gateway(Vec::new()).await;
    let response = server.post("/api/tools/missing/execute").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_listing_hides_credentials() {
    let record = ServerRecord::new("alpha", "http://alpha.internal").with_auth(
        agent_gateway::mcp::auth::AuthConfig::BearerToken {
            token: "s3cret".into(),
        },
    );
    let server = gateway(vec![record]).await;

    let body = server.get("/api/servers").await.text();
    assert!(body.contains("alpha"));
    assert!(!body.contains("s3cret"));
}

#[tokio::test]
async fn server_health_probe() {
    let dead = dead_url().await;
    let server = gateway(vec![ServerRecord::new("down", &dead)]).await;

    let status: Value = server.get("/api/servers/down/health").await.json();
    assert_eq!(status["status"], "unhealthy");
    assert_eq!(status["consecutive_failures"], 1);

    let snapshots: Value = server.get("/api/health").await.json();
    assert_eq!(snapshots.as_object().map(|m| m.len()), Some(1));

    let servers: Vec<Value> = server.get("/api/servers").await.json();
    assert_eq!(servers[0]["last_known_status"], "unhealthy");

    server
        .get("/api/servers/nobody/health")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
