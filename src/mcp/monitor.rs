use crate::mcp::client::McpClient;
use crate::registry::{ServerRecord, ServerRegistry};
use chrono::{TimeDelta, Utc};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

/// Periodically probe enabled servers whose last check is older than their
/// `health_check_interval_seconds`. Stops when `shutdown` becomes `true` or
/// its sender is dropped.
pub fn spawn_health_monitor(
    registry: Arc<dyn ServerRegistry>,
    client: Arc<McpClient>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            name: "mcp.monitor.started",
            tick_secs = tick.as_secs_f64(),
            "Health monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    run_health_sweep(registry.as_ref(), &client).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(name: "mcp.monitor.stopped", "Health monitor stopped");
    })
}

/// Probe every due server once, concurrently. Returns how many were probed.
pub async fn run_health_sweep(registry: &dyn ServerRegistry, client: &McpClient) -> usize {
    let servers = match registry.list_enabled_servers().await {
        Ok(servers) => servers,
        Err(err) => {
            tracing::warn!(error = %err, "Health sweep could not list servers");
            return 0;
        }
    };

    let due: Vec<ServerRecord> = servers.into_iter().filter(is_due).collect();
    let probes = due.iter().map(|server| async move {
        let status = client.check_health(&server.base_url).await;
        (server, status)
    });
    let results = futures::future::join_all(probes).await;

    for (server, status) in &results {
        if let Err(err) = registry.update_status(server.id, status.status, None).await {
            tracing::warn!(server = %server.name, error = %err, "Failed to record health status");
        }
    }
    results.len()
}

fn is_due(server: &ServerRecord) -> bool {
    match server.last_checked_at {
        None => true,
        Some(last) => TimeDelta::from_std(server.health_check_interval())
            .is_ok_and(|interval| Utc::now().signed_duration_since(last) >= interval),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_checked_servers_are_due() {
        let mut server = ServerRecord::new("a", "http://a");
        assert!(is_due(&server));

        server.last_checked_at = Some(Utc::now());
        assert!(!is_due(&server));

        server.last_checked_at = Some(Utc::now() - TimeDelta::seconds(301));
        assert!(is_due(&server));
    }
}
