//! Known tool servers.
//!
//! The gateway core only reads [`ServerRecord`]s and writes status updates
//! back through [`ServerRegistry`]; creating and deleting records is the job
//! of whatever backs the registry.

use crate::mcp::{auth::AuthConfig, health::ServerStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub mod file;
pub mod memory;

pub use file::load_servers_file;
pub use memory::InMemoryServerRegistry;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub last_known_status: Option<ServerStatus>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_tools: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn default_health_check_interval() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

impl ServerRecord {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_url: base_url.into(),
            enabled: true,
            auth: AuthConfig::None,
            health_check_interval_seconds: default_health_check_interval(),
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout(),
            last_known_status: None,
            last_checked_at: None,
            available_tools: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[async_trait]
pub trait ServerRegistry: Send + Sync + std::fmt::Debug {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;

    async fn list_enabled_servers(&self) -> Result<Vec<ServerRecord>> {
        Ok(self
            .list_servers()
            .await?
            .into_iter()
            .filter(|s| s.enabled)
            .collect())
    }

    async fn get_server(&self, name: &str) -> Result<Option<ServerRecord>>;

    /// Record the latest status; `tools_snapshot` replaces the cached catalog when present.
    async fn update_status(
        &self,
        server_id: Uuid,
        status: ServerStatus,
        tools_snapshot: Option<serde_json::Value>,
    ) -> Result<()>;
}
