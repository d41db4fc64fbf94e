//! Periodic plugin health reporting
//!
//! The monitor reads the registry and runtime cache on a fixed interval and
//! publishes an aggregate report. It never deactivates anything; remediation
//! is left to operators watching the reports.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::host::PluginHost;
use crate::events::{EventBus, PluginEvent};

/// Error count above which a plugin is reported as `error`.
pub const ERROR_THRESHOLD: u64 = 10;
/// Error count above which a plugin is reported as `warning`.
pub const WARN_THRESHOLD: u64 = 5;
/// How often the monitor sweeps by default.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(300);

/// Health classification of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
}

/// Health detail for one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginHealth {
    /// Identity key.
    pub key: String,
    /// Plugin name.
    pub name: String,
    /// Classification from the error counter.
    pub status: HealthStatus,
    /// Requests dispatched since load.
    pub request_count: u64,
    /// Handler errors since load.
    pub error_count: u64,
    /// Last dispatch time.
    pub last_used: Option<DateTime<Utc>>,
}

/// Aggregate health report over all active plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// When the sweep ran.
    pub generated_at: DateTime<Utc>,
    /// Active plugins examined.
    pub total: usize,
    /// Plugins classified healthy.
    pub healthy: usize,
    /// Plugins classified warning.
    pub warnings: usize,
    /// Plugins classified error.
    pub errors: usize,
    /// Per-plugin detail, sorted by name.
    pub plugins: Vec<PluginHealth>,
}

fn classify(error_count: u64) -> HealthStatus {
    if error_count > ERROR_THRESHOLD {
        HealthStatus::Error
    } else if error_count > WARN_THRESHOLD {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

impl PluginHost {
    /// Produce a health report over the active registry entries.
    pub fn check_health(&self) -> HealthReport {
        let mut plugins: Vec<PluginHealth> = self
            .registry()
            .iter()
            .filter(|(_, entry)| entry.is_active())
            .map(|(key, entry)| {
                let (request_count, error_count, last_used) = self
                    .cache()
                    .get(key)
                    .map(|c| (c.request_count, c.error_count, c.last_used))
                    .unwrap_or((0, 0, None));
                PluginHealth {
                    key: key.clone(),
                    name: entry.descriptor.name.clone(),
                    status: classify(error_count),
                    request_count,
                    error_count,
                    last_used,
                }
            })
            .collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));

        let healthy = plugins
            .iter()
            .filter(|p| p.status == HealthStatus::Healthy)
            .count();
        let warnings = plugins
            .iter()
            .filter(|p| p.status == HealthStatus::Warning)
            .count();
        let errors = plugins
            .iter()
            .filter(|p| p.status == HealthStatus::Error)
            .count();

        HealthReport {
            generated_at: Utc::now(),
            total: plugins.len(),
            healthy,
            warnings,
            errors,
            plugins,
        }
    }
}

/// Background task sweeping plugin health on an interval.
pub struct HealthMonitor {
    host: Arc<RwLock<PluginHost>>,
    events: Arc<dyn EventBus>,
    interval: Duration,
}

impl HealthMonitor {
    /// Create a monitor with the default interval.
    pub fn new(host: Arc<RwLock<PluginHost>>, events: Arc<dyn EventBus>) -> Self {
        Self {
            host,
            events,
            interval: DEFAULT_HEALTH_INTERVAL,
        }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the sweep loop. Runs until the token is cancelled.
    ///
    /// Sweeps take a read lock only, so they never block dispatch for long,
    /// and a sweep cannot fail the task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the first
            // report lands one full interval after startup
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("health monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.host.read().await.check_health();
                        tracing::debug!(
                            total = report.total,
                            healthy = report.healthy,
                            warnings = report.warnings,
                            errors = report.errors,
                            "plugin health sweep"
                        );
                        self.events
                            .publish(PluginEvent::Health { report })
                            .await;
                    }
                }
            }
        })
    }
}
