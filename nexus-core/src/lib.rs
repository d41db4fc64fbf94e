//! Core library for NexusCore - the plugin registry and loader
//!
//! The interesting machinery lives in [`plugins`]: descriptor discovery from
//! a persisted catalog and a filesystem tree, validation, a live route table,
//! runtime lifecycle operations, and a periodic health monitor. [`events`]
//! carries the typed lifecycle events external subscribers consume, and
//! [`auth`] holds the caller context the web layer consults before lifecycle
//! operations.

pub mod auth;
pub mod events;
pub mod plugins;

pub use auth::{AuthContext, Identity};
pub use events::{EventBus, EventSeq, MemoryEventBus, PluginEvent};
pub use plugins::{
    BackupReport, HealthMonitor, HealthReport, HealthStatus, LifecycleError, LoadReport,
    MemoryPluginStore, FilePluginStore, PluginCache, PluginCacheEntry, PluginHealth, PluginHost,
    PluginHostConfig, PluginHostError, PluginPatch, PluginRecord, PluginRegistry, PluginState,
    PluginStore, RegisteredPlugin, RouteTable, StoreError,
};
