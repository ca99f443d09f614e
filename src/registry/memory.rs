use super::{ServerRecord, ServerRegistry};
use crate::mcp::health::ServerStatus;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local registry, seeded at startup from the servers file.
#[derive(Debug, Default)]
pub struct InMemoryServerRegistry {
    servers: RwLock<Vec<ServerRecord>>,
}

impl InMemoryServerRegistry {
    /// Fails if two records share a name or a base URL.
    pub fn new(servers: Vec<ServerRecord>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut urls = HashSet::new();
        for server in &servers {
            if !names.insert(server.name.as_str()) {
                bail!("duplicate server name '{}'", server.name);
            }
            let url = crate::mcp::client::normalize_base_url(&server.base_url);
            if !urls.insert(url) {
                bail!("duplicate server base_url '{}'", server.base_url);
            }
        }
        Ok(Self {
            servers: RwLock::new(servers),
        })
    }
}

#[async_trait]
impl ServerRegistry for InMemoryServerRegistry {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        Ok(self.servers.read().await.clone())
    }

    async fn get_server(&self, name: &str) -> Result<Option<ServerRecord>> {
        Ok(self
            .servers
            .read()
            .await
            .iter()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn update_status(
        &self,
        server_id: Uuid,
        status: ServerStatus,
        tools_snapshot: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut servers = self.servers.write().await;
        let server = servers
            .iter_mut()
            .find(|s| s.id == server_id)
            .ok_or_else(|| anyhow!("unknown server id {server_id}"))?;
        server.last_known_status = Some(status);
        server.last_checked_at = Some(Utc::now());
        if let Some(snapshot) = tools_snapshot {
            server.available_tools = Some(snapshot);
        }
        Ok(())
    }
}
