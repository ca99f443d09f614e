use crate::mcp::auth::AuthConfig;
use crate::mcp::health::HealthRegistry;
use reqwest::header::HeaderMap;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::{Duration, Instant},
};

pub const HEALTH_PATH: &str = "/mcp/v1/health";
pub const TOOLS_PATH: &str = "/mcp/v1/tools";
pub const CALL_PATH: &str = "/mcp/v1/tools/call";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Total discovery attempts per call.
    pub max_retries: u32,
    /// First backoff delay; doubles on each further retry.
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    /// Liveness probes use their own short timeout.
    pub health_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

/// HTTP client for remote tool servers.
///
/// One instance is shared by the loader, every wrapped tool and the health
/// monitor. It owns the per-server health registry and remembers the auth
/// configuration last supplied for each base URL.
#[derive(Debug)]
pub struct McpClient {
    pub(crate) http: reqwest::Client,
    settings: ClientSettings,
    auth: RwLock<HashMap<String, AuthConfig>>,
    health: HealthRegistry,
}

impl McpClient {
    pub fn new(settings: ClientSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("agent-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(http, settings))
    }

    pub fn with_http_client(http: reqwest::Client, settings: ClientSettings) -> Self {
        Self {
            http,
            settings,
            auth: RwLock::new(HashMap::new()),
            health: HealthRegistry::default(),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Cache credentials for `base_url`; later requests to it reuse them.
    pub fn set_auth(&self, base_url: &str, auth: AuthConfig) {
        self.auth
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_base_url(base_url), auth);
    }

    pub(crate) fn auth_headers(&self, base_url: &str) -> HeaderMap {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(base_url)
            .map(AuthConfig::headers)
            .unwrap_or_default()
    }
}

/// Canonical key for a server: the base URL without trailing slashes.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{base_url}{path}")
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

pub(crate) fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    if body.chars().count() <= MAX_CHARS {
        body.to_string()
    } else {
        let mut out: String = body.chars().take(MAX_CHARS).collect();
        out.push('…');
        out
    }
}
