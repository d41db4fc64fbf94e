//! Shared application state for the nexus server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nexus_core::{MemoryEventBus, MemoryPluginStore, PluginHost, PluginHostConfig};
use tokio::sync::RwLock;

use crate::middleware::AdminAuth;

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Plugin host behind a lock: reads for queries, writes for lifecycle
    /// operations and dispatch bookkeeping
    pub plugin_host: Arc<RwLock<PluginHost>>,
    /// Event bus the host publishes lifecycle events on
    pub event_bus: Arc<MemoryEventBus>,
    /// Admin gate consulted before lifecycle operations
    pub admin: AdminAuth,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state around an existing host and bus.
    pub fn new(
        plugin_host: Arc<RwLock<PluginHost>>,
        event_bus: Arc<MemoryEventBus>,
        admin: AdminAuth,
    ) -> Self {
        Self {
            plugin_host,
            event_bus,
            admin,
            started_at: Utc::now(),
        }
    }

    /// State with in-memory components and no admin gate (for testing).
    pub fn ephemeral() -> Self {
        let event_bus = Arc::new(MemoryEventBus::new(1_000));
        let host = PluginHost::new(
            PluginHostConfig::default(),
            Arc::new(MemoryPluginStore::new()),
            event_bus.clone(),
        );
        Self::new(
            Arc::new(RwLock::new(host)),
            event_bus,
            AdminAuth::disabled(),
        )
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_state() {
        let state = AppState::ephemeral();
        assert!(state.uptime_seconds() >= 0);
    }
}
