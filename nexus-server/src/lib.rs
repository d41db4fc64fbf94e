//! nexus-server - HTTP layer for NexusCore
//!
//! The server owns the shared [`AppState`] (plugin host, event bus, admin
//! gate) and exposes the admin/query API plus the catch-all plugin route
//! dispatcher. Lifecycle endpoints consult the admin gate before touching
//! the host.

mod error;
pub mod http;
pub mod middleware;
mod state;

use std::sync::Arc;

use nexus_core::{EventBus, HealthMonitor};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ServerError;
pub use http::create_router;
pub use middleware::AdminAuth;
pub use state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7480,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "0.0.0.0:7480")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The main nexus server
pub struct NexusServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl NexusServer {
    /// Create a server over prepared application state
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address.
    ///
    /// The plugin health monitor runs for the life of the server and is
    /// stopped when serving ends.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("nexus server listening on {}", addr);

        let shutdown = CancellationToken::new();
        let events: Arc<dyn EventBus> = self.state.event_bus.clone();
        let monitor = HealthMonitor::new(self.state.plugin_host.clone(), events);
        let monitor_handle = monitor.spawn(shutdown.clone());

        let router = create_router(self.state);
        let result = axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        shutdown.cancel();
        let _ = monitor_handle.await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7480);
    }

    #[test]
    fn test_server_config_addr() {
        let config = ServerConfig::new("127.0.0.1", 8080);
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_nexus_server_new() {
        let config = ServerConfig::new("127.0.0.1", 9000);
        let server = NexusServer::new(config, Arc::new(AppState::ephemeral()));
        assert_eq!(server.config().port, 9000);
    }
}
