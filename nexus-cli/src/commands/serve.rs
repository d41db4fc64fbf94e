//! `nexus serve` - run the HTTP server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use nexus_core::{FilePluginStore, MemoryEventBus, PluginHost, PluginHostConfig};
use nexus_server::{AdminAuth, AppState, NexusServer, ServerConfig};
use nexus_welcome::WelcomeHandler;
use tokio::sync::RwLock;

/// Name of the catalog file kept alongside the plugin directories.
const CATALOG_FILE: &str = "catalog.toml";

#[derive(Args)]
pub struct ServeArgs {
    /// Host address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 7480)]
    pub port: u16,

    /// Plugins directory (defaults to the XDG data dir)
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Bearer token gating lifecycle endpoints; unset leaves them open to
    /// every caller
    #[arg(long)]
    pub admin_token: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let plugins_dir = args.plugins_dir.unwrap_or_else(nexus_paths::plugins_dir);
    let store = Arc::new(FilePluginStore::open(plugins_dir.join(CATALOG_FILE))?);
    let event_bus = Arc::new(MemoryEventBus::new(10_000));

    let config = PluginHostConfig {
        plugins_dir,
        uploads_dir: nexus_paths::uploads_dir(),
    };
    let mut host = PluginHost::new(config, store, event_bus.clone());
    host.register_handler("Welcome", Arc::new(WelcomeHandler::new()));

    let report = host.load_all().await?;
    tracing::info!(
        total = report.total,
        active = report.active,
        errors = report.errors,
        "plugins loaded"
    );

    // First run: seed the built-in welcome plugin so a fresh install has
    // something to serve
    if host.registry().by_name("Welcome").is_none() {
        match host.install(nexus_welcome::default_descriptor(), None).await {
            Ok(descriptor) => {
                tracing::info!(route = %descriptor.route, "welcome plugin installed");
            }
            Err(e) => tracing::warn!(error = %e, "could not install welcome plugin"),
        }
    }

    let admin = match args.admin_token {
        Some(token) => AdminAuth::with_token(token),
        None => AdminAuth::disabled(),
    };
    let state = Arc::new(AppState::new(
        Arc::new(RwLock::new(host)),
        event_bus,
        admin,
    ));

    let server = NexusServer::new(ServerConfig::new(args.host, args.port), state);
    server.run().await?;
    Ok(())
}
