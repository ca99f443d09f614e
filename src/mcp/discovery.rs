use crate::mcp::{
    auth::AuthConfig,
    client::{ClientSettings, McpClient, TOOLS_PATH, endpoint, normalize_base_url, snippet},
    error::DiscoveryError,
    types::ToolDefinition,
};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
}

impl From<&ClientSettings> for DiscoveryOptions {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_base_delay: settings.retry_base_delay,
            request_timeout: settings.request_timeout,
        }
    }
}

/// A catalog entry that could not be parsed into a [`ToolDefinition`].
#[derive(Debug, Clone, Serialize)]
pub struct RejectedEntry {
    pub index: usize,
    pub tool_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    pub tools: Vec<ToolDefinition>,
    pub rejected: Vec<RejectedEntry>,
}

struct AttemptFailure {
    status: Option<u16>,
    body: Option<String>,
    message: String,
}

/// Delay before retry number `attempt + 1`: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX))
}

impl McpClient {
    /// List the tools advertised by a server, using this client's retry settings.
    pub async fn discover_tools(
        &self,
        base_url: &str,
        auth: Option<AuthConfig>,
    ) -> Result<Vec<ToolDefinition>, DiscoveryError> {
        let options = DiscoveryOptions::from(self.settings());
        Ok(self.discover_catalog(base_url, auth, &options).await?.tools)
    }

    /// Like [`McpClient::discover_tools`] but also reports the entries that
    /// were dropped because they failed to parse.
    pub async fn discover_catalog(
        &self,
        base_url: &str,
        auth: Option<AuthConfig>,
        options: &DiscoveryOptions,
    ) -> Result<ToolCatalog, DiscoveryError> {
        let base = normalize_base_url(base_url);
        if let Some(auth) = auth {
            self.set_auth(&base, auth);
        }

        let url = endpoint(&base, TOOLS_PATH);
        let attempts = options.max_retries.max(1);
        let mut last_failure = None;

        for attempt in 0..attempts {
            match self.fetch_catalog(&base, &url, options.request_timeout).await {
                Ok((status, body)) => return self.parse_catalog(&base, status, &body),
                Err(failure) => {
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(options.retry_base_delay, attempt);
                        tracing::warn!(
                            name: "mcp.discovery.retry",
                            server_url = %base,
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            status_code = ?failure.status,
                            error = %failure.message,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Tool discovery attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let failure = last_failure.unwrap_or(AttemptFailure {
            status: None,
            body: None,
            message: "no attempts made".to_string(),
        });
        tracing::error!(
            name: "mcp.discovery.failed",
            server_url = %base,
            attempts = attempts,
            status_code = ?failure.status,
            error = %failure.message,
            "Tool discovery exhausted retries"
        );
        Err(DiscoveryError::Exhausted {
            server_url: base,
            attempts,
            status: failure.status,
            body_snippet: failure.body,
            message: failure.message,
        })
    }

    async fn fetch_catalog(
        &self,
        base: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<(u16, String), AttemptFailure> {
        let response = self
            .http
            .get(url)
            .headers(self.auth_headers(base))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AttemptFailure {
                status: None,
                body: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AttemptFailure {
            status: Some(status.as_u16()),
            body: None,
            message: e.to_string(),
        })?;

        if status.is_success() {
            Ok((status.as_u16(), body))
        } else {
            Err(AttemptFailure {
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status.as_u16()),
                body: Some(snippet(&body)),
            })
        }
    }

    fn parse_catalog(
        &self,
        base: &str,
        status: u16,
        body: &str,
    ) -> Result<ToolCatalog, DiscoveryError> {
        let entries = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Array(entries)) => entries,
            Ok(other) => {
                return Err(DiscoveryError::Protocol {
                    server_url: base.to_string(),
                    status,
                    body_snippet: snippet(body),
                    message: format!("expected a JSON array, got {}", json_kind(&other)),
                });
            }
            Err(e) => {
                return Err(DiscoveryError::Protocol {
                    server_url: base.to_string(),
                    status,
                    body_snippet: snippet(body),
                    message: format!("invalid JSON: {e}"),
                });
            }
        };

        let mut catalog = ToolCatalog::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let tool_id = entry
                .get("tool_id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
            match parse_entry(entry) {
                Ok(definition) => catalog.tools.push(definition),
                Err(reason) => {
                    tracing::warn!(
                        name: "mcp.discovery.entry_skipped",
                        server_url = %base,
                        index = index,
                        tool_id = ?tool_id,
                        reason = %reason,
                        "Skipping malformed tool definition"
                    );
                    catalog.rejected.push(RejectedEntry {
                        index,
                        tool_id,
                        reason,
                    });
                }
            }
        }

        // A parsed catalog means the server is reachable, even if some entries were dropped.
        self.health().record_success(base, None);

        tracing::info!(
            name: "mcp.discovery.complete",
            server_url = %base,
            tools = catalog.tools.len(),
            skipped = catalog.rejected.len(),
            "Tool discovery complete"
        );
        Ok(catalog)
    }
}

fn parse_entry(entry: serde_json::Value) -> Result<ToolDefinition, String> {
    let definition: ToolDefinition = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    if definition.tool_id.trim().is_empty() {
        return Err("tool_id must not be empty".to_string());
    }
    Ok(definition)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
