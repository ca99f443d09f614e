#![allow(dead_code)]

use agent_gateway::mcp::{ClientSettings, McpClient};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing_subscriber::{Layer, layer::Context, prelude::*};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Records the name of every tracing event emitted on the current thread.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Install as the thread default; events are recorded until the guard drops.
    pub fn capture() -> (Self, tracing::subscriber::DefaultGuard) {
        let log = Self::default();
        let subscriber = tracing_subscriber::registry().with(log.clone());
        (log, tracing::subscriber::set_default(subscriber))
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

impl<S: tracing::Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0
            .lock()
            .unwrap()
            .push(event.metadata().name().to_string());
    }
}

pub fn fast_client() -> Arc<McpClient> {
    Arc::new(
        McpClient::new(ClientSettings {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(20),
            request_timeout: Duration::from_secs(5),
            health_timeout: Duration::from_millis(500),
        })
        .unwrap(),
    )
}

pub fn tool(id: &str) -> Value {
    json!({
        "tool_id": id,
        "name": id,
        "description": format!("{id} tool"),
        "input_schema": {
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "what to look up" }
            },
            "required": ["query"]
        },
        "output_schema": { "type": "object" }
    })
}

#[derive(Debug, Default)]
pub struct Hits {
    pub health: AtomicUsize,
    pub tools: AtomicUsize,
    pub calls: AtomicUsize,
}

impl Hits {
    pub fn health(&self) -> usize {
        self.health.load(Ordering::SeqCst)
    }
    pub fn tools(&self) -> usize {
        self.tools.load(Ordering::SeqCst)
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub enum CallBehavior {
    /// Echo parameters back as a successful result.
    Echo,
    /// Structured `status: "error"` payload with HTTP 200.
    ToolError(String),
    /// Arbitrary status and raw body.
    Raw(u16, String),
}

/// Tool server exposing a fixed catalog.
pub struct MockToolServer {
    pub catalog: Value,
    pub health_status: u16,
    pub call: CallBehavior,
    pub tools_delay: Duration,
}

impl MockToolServer {
    pub fn with_catalog(catalog: Value) -> Self {
        Self {
            catalog,
            health_status: 200,
            call: CallBehavior::Echo,
            tools_delay: Duration::ZERO,
        }
    }

    pub async fn spawn(self) -> (String, Arc<Hits>) {
        let hits = Arc::new(Hits::default());
        let catalog = Arc::new(self.catalog);
        let health_status = StatusCode::from_u16(self.health_status).unwrap();
        let call = self.call;
        let delay = self.tools_delay;

        let health_hits = Arc::clone(&hits);
        let tools_hits = Arc::clone(&hits);
        let call_hits = Arc::clone(&hits);

        let router = Router::new()
            .route(
                "/mcp/v1/health",
                get(move || {
                    let hits = Arc::clone(&health_hits);
                    async move {
                        hits.health.fetch_add(1, Ordering::SeqCst);
                        (health_status, "ok")
                    }
                }),
            )
            .route(
                "/mcp/v1/tools",
                get(move || {
                    let hits = Arc::clone(&tools_hits);
                    let catalog = Arc::clone(&catalog);
                    async move {
                        hits.tools.fetch_add(1, Ordering::SeqCst);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        Json((*catalog).clone())
                    }
                }),
            )
            .route(
                "/mcp/v1/tools/call",
                post(move |Json(body): Json<Value>| {
                    let hits = Arc::clone(&call_hits);
                    let call = call.clone();
                    async move {
                        hits.calls.fetch_add(1, Ordering::SeqCst);
                        call_response(&call, &body)
                    }
                }),
            );

        (spawn_server(router).await, hits)
    }
}

fn call_response(behavior: &CallBehavior, body: &Value) -> Response {
    let tool_id = body["tool_id"].clone();
    match behavior {
        CallBehavior::Echo => Json(json!({
            "tool_id": tool_id,
            "status": "success",
            "result": body["parameters"].clone(),
        }))
        .into_response(),
        CallBehavior::ToolError(message) => Json(json!({
            "tool_id": tool_id,
            "status": "error",
            "error_message": message,
        }))
        .into_response(),
        CallBehavior::Raw(status, raw) => {
            (StatusCode::from_u16(*status).unwrap(), raw.clone()).into_response()
        }
    }
}
