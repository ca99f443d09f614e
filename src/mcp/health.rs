//! Server liveness tracking.
//!
//! [`HealthRegistry`] keeps the latest [`HealthStatus`] per server base URL.
//! Every entry sits behind its own mutex so the read-modify-write of the
//! failure counter is atomic per server, while different servers never
//! contend with each other.

use crate::mcp::client::{HEALTH_PATH, McpClient, elapsed_ms, endpoint, normalize_base_url};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::{Duration, Instant},
};

/// Tool calls against a server are refused once its failure count exceeds this.
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Healthy,
    Unhealthy,
    Unknown,
    Timeout,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: ServerStatus,
    pub last_check: DateTime<Utc>,
    pub response_time_ms: Option<f64>,
    pub error_message: Option<String>,
    pub consecutive_failures: u32,
}

impl HealthStatus {
    pub fn unknown() -> Self {
        Self {
            status: ServerStatus::Unknown,
            last_check: Utc::now(),
            response_time_ms: None,
            error_message: None,
            consecutive_failures: 0,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.status != ServerStatus::Healthy
            && self.consecutive_failures > CIRCUIT_BREAKER_THRESHOLD
    }

    /// Whether this snapshot is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        TimeDelta::from_std(max_age)
            .is_ok_and(|limit| Utc::now().signed_duration_since(self.last_check) > limit)
    }
}

type Slot = Arc<Mutex<Option<HealthStatus>>>;

#[derive(Debug, Default)]
pub struct HealthRegistry {
    slots: RwLock<HashMap<String, Slot>>,
}

impl HealthRegistry {
    fn slot(&self, server_url: &str) -> Slot {
        let key = normalize_base_url(server_url);
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    fn update(
        &self,
        server_url: &str,
        f: impl FnOnce(Option<&HealthStatus>) -> HealthStatus,
    ) -> HealthStatus {
        let slot = self.slot(server_url);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let next = f(guard.as_ref());
        *guard = Some(next.clone());
        next
    }

    pub fn record_success(&self, server_url: &str, response_time_ms: Option<f64>) -> HealthStatus {
        self.update(server_url, |_| HealthStatus {
            status: ServerStatus::Healthy,
            last_check: Utc::now(),
            response_time_ms,
            error_message: None,
            consecutive_failures: 0,
        })
    }

    pub fn record_failure(
        &self,
        server_url: &str,
        status: ServerStatus,
        error_message: impl Into<String>,
        response_time_ms: Option<f64>,
    ) -> HealthStatus {
        let error_message = error_message.into();
        self.update(server_url, |prev| HealthStatus {
            status,
            last_check: Utc::now(),
            response_time_ms,
            error_message: Some(error_message),
            consecutive_failures: prev.map_or(0, |p| p.consecutive_failures).saturating_add(1),
        })
    }

    pub fn snapshot(&self, server_url: &str) -> Option<HealthStatus> {
        let key = normalize_base_url(server_url);
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(Arc::clone)?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    pub fn consecutive_failures(&self, server_url: &str) -> u32 {
        self.snapshot(server_url)
            .map_or(0, |s| s.consecutive_failures)
    }

    pub fn all(&self) -> BTreeMap<String, HealthStatus> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        slots
            .into_iter()
            .filter_map(|(k, slot)| {
                let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
                guard.clone().map(|s| (k, s))
            })
            .collect()
    }
}

pub(crate) fn classify_transport_error(err: &reqwest::Error) -> ServerStatus {
    let text = err.to_string().to_lowercase();
    if err.is_timeout() || text.contains("timeout") || text.contains("timed out") {
        ServerStatus::Timeout
    } else {
        ServerStatus::Unhealthy
    }
}

impl McpClient {
    /// Probe `GET {base_url}/mcp/v1/health` and record the outcome.
    pub async fn check_health(&self, base_url: &str) -> HealthStatus {
        let base = normalize_base_url(base_url);
        let started = Instant::now();
        let result = self
            .http
            .get(endpoint(&base, HEALTH_PATH))
            .headers(self.auth_headers(&base))
            .timeout(self.settings().health_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                let status = self.health().record_success(&base, Some(elapsed_ms(started)));
                tracing::debug!(
                    name: "mcp.health.ok",
                    server_url = %base,
                    response_time_ms = ?status.response_time_ms,
                    "Server healthy"
                );
                status
            }
            Ok(response) => {
                let code = response.status().as_u16();
                let status = self.health().record_failure(
                    &base,
                    ServerStatus::Unhealthy,
                    format!("HTTP {code}"),
                    Some(elapsed_ms(started)),
                );
                tracing::warn!(
                    name: "mcp.health.unhealthy",
                    server_url = %base,
                    status_code = code,
                    consecutive_failures = status.consecutive_failures,
                    "Server health check failed"
                );
                status
            }
            Err(err) => {
                let kind = classify_transport_error(&err);
                let status = self
                    .health()
                    .record_failure(&base, kind, err.to_string(), None);
                tracing::warn!(
                    name: "mcp.health.error",
                    server_url = %base,
                    status = %kind,
                    error = %err,
                    consecutive_failures = status.consecutive_failures,
                    "Server health check errored"
                );
                status
            }
        }
    }
}
