use crate::mcp::{ClientSettings, ConflictPolicy, LoadOptions};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Tool server list (YAML or JSON)
    #[arg(long, env = "SERVERS_FILE")]
    pub servers_file: Option<String>,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mcp: McpSettings,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpSettings {
    pub servers_file: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub max_concurrent_servers: usize,
    pub timeout_per_server_secs: f64,
    pub conflict_resolution: ConflictPolicy,
    /// 0 disables the background health monitor.
    pub monitor_tick_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub json: bool,
}

impl McpSettings {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            health_timeout: Duration::from_secs(self.health_timeout_secs),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            conflict_resolution: self.conflict_resolution,
            max_concurrent_servers: self.max_concurrent_servers,
            timeout_per_server: duration_from_secs_f64(self.timeout_per_server_secs),
        }
    }
}

/// Negative or non-finite values fall back to zero.
pub fn duration_from_secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("mcp.servers_file", "servers.yaml")?
            .set_default("mcp.max_retries", 3)?
            .set_default("mcp.retry_base_delay_ms", 1000)?
            .set_default("mcp.request_timeout_secs", 30)?
            .set_default("mcp.health_timeout_secs", 5)?
            .set_default("mcp.max_concurrent_servers", 5)?
            .set_default("mcp.timeout_per_server_secs", 30.0)?
            .set_default("mcp.conflict_resolution", "prefix")?
            .set_default("mcp.monitor_tick_secs", 60)?
            .set_default("telemetry.json", false)?;

        // Explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. GATEWAY_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Priority: CLI flag / CLI env var > GATEWAY_ env > config file > defaults.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(path) = cli.servers_file {
            builder = builder.set_override("mcp.servers_file", path)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("telemetry.json", json)?;
        }

        builder.build()?.try_deserialize()
    }
}
