//! Plugin subsystem for NexusCore
//!
//! This module provides the infrastructure for discovering, validating,
//! registering, and managing plugins:
//!
//! - [`PluginHost`]: loader and lifecycle manager (load pass, install,
//!   update, uninstall, backup, route dispatch)
//! - [`PluginRegistry`]: in-memory authoritative map of registered plugins,
//!   keyed by `name@version`
//! - [`RouteTable`]: live dispatch table consulted per request, so removing
//!   a plugin makes its routes unreachable without a restart
//! - [`PluginStore`]: persisted catalog abstraction (file-backed and
//!   in-memory implementations)
//! - [`PluginCache`]: per-plugin runtime counters feeding health reports
//! - [`HealthMonitor`]: periodic background health sweep
//!
//! # Plugin Discovery
//!
//! Plugins are discovered from two sources, in order:
//! 1. The persisted catalog (records flagged active)
//! 2. The plugins directory (one subdirectory per candidate)
//!
//! The first source to register an identity key (`name@version`) wins;
//! filesystem discoveries are upserted back into the catalog so they become
//! persisted from then on.
//!
//! # Plugin Directory Structure
//!
//! Each plugin directory may contain:
//! - `plugin.toml` (required) - the descriptor
//! - `config.toml` (optional) - extra configuration merged into the
//!   descriptor's config map
//! - `view.html` (optional) - presence marks the plugin as having a view
//!
//! Executable behavior comes from [`PluginHandler`] implementations
//! registered into the host by name at startup, not from files on disk.
//!
//! [`PluginHandler`]: nexus_plugin_api::PluginHandler

mod cache;
mod error;
mod health;
mod host;
mod registry;
mod routes;
mod store;

pub use cache::{PluginCache, PluginCacheEntry};
pub use error::{LifecycleError, PluginHostError};
pub use health::{
    DEFAULT_HEALTH_INTERVAL, ERROR_THRESHOLD, HealthMonitor, HealthReport, HealthStatus,
    PluginHealth, WARN_THRESHOLD,
};
pub use host::{
    BackupReport, CONFIG_FILE, DESCRIPTOR_FILE, LoadReport, PluginHost, PluginHostConfig,
    VIEW_FILE,
};
pub use registry::{FEATURED_LIMIT, PluginRegistry, PluginState, RegisteredPlugin};
pub use routes::{RegisteredRoute, RouteTable};
pub use store::{
    FilePluginStore, MemoryPluginStore, PluginPatch, PluginRecord, PluginStore, StoreError,
};
