//! Agent tool gateway server
//!
//! Entry point: loads configuration, initialises tracing and serves the API.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use agent_gateway::{config::AppConfig, server, telemetry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = Arc::new(AppConfig::load()?);
    telemetry::init(config.telemetry.json);

    tracing::info!(
        name: "config.loaded",
        servers_file = %config.mcp.servers_file,
        max_concurrent_servers = config.mcp.max_concurrent_servers,
        conflict_resolution = %config.mcp.conflict_resolution,
        "Configuration loaded"
    );

    server::start_server(config).await
}
