use crate::mcp::{
    client::{CALL_PATH, McpClient, elapsed_ms, endpoint, normalize_base_url, snippet},
    error::InvocationError,
    health::{ServerStatus, classify_transport_error},
    types::{CallResponse, CallToolRequest},
};
use std::time::Instant;

impl McpClient {
    /// Execute one remote tool call. Never retried: calls may have side effects.
    ///
    /// Any parsed [`CallResponse`] is returned as-is, including structured
    /// error payloads sent with a 4xx/5xx status.
    pub async fn call_tool(
        &self,
        base_url: &str,
        tool_id: &str,
        parameters: serde_json::Value,
    ) -> Result<CallResponse, InvocationError> {
        let base = normalize_base_url(base_url);
        let request = CallToolRequest {
            tool_id: tool_id.to_string(),
            parameters,
        };
        let started = Instant::now();

        let response = match self
            .http
            .post(endpoint(&base, CALL_PATH))
            .headers(self.auth_headers(&base))
            .timeout(self.settings().request_timeout)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.health()
                    .record_failure(&base, classify_transport_error(&err), err.to_string(), None);
                return Err(InvocationError::Transport {
                    server_url: base,
                    message: err.to_string(),
                });
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                self.health()
                    .record_failure(&base, classify_transport_error(&err), err.to_string(), None);
                return Err(InvocationError::Transport {
                    server_url: base,
                    message: err.to_string(),
                });
            }
        };
        let response_time = Some(elapsed_ms(started));

        match serde_json::from_str::<CallResponse>(&body) {
            Ok(parsed) => {
                self.health().record_success(&base, response_time);
                tracing::debug!(
                    name: "mcp.invoke.response",
                    server_url = %base,
                    tool_id = %tool_id,
                    http_status = status.as_u16(),
                    call_status = ?parsed.status,
                    "Tool call answered"
                );
                Ok(parsed)
            }
            Err(err) if status.is_success() => {
                self.health().record_failure(
                    &base,
                    ServerStatus::Unhealthy,
                    format!("malformed response: {err}"),
                    response_time,
                );
                Err(InvocationError::MalformedResponse {
                    server_url: base,
                    status: status.as_u16(),
                    message: err.to_string(),
                })
            }
            Err(_) => {
                self.health().record_failure(
                    &base,
                    ServerStatus::Unhealthy,
                    format!("HTTP {}", status.as_u16()),
                    response_time,
                );
                Err(InvocationError::Http {
                    server_url: base,
                    status: status.as_u16(),
                    body: snippet(&body),
                })
            }
        }
    }
}
