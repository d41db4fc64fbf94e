//! Plugin lifecycle event vocabulary

use serde::{Deserialize, Serialize};

use crate::plugins::{HealthReport, LoadReport};

/// Everything the plugin subsystem announces to the outside world.
///
/// The web layer forwards these to connected clients; nothing in the core
/// depends on anyone listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginEvent {
    /// One plugin was admitted into the registry during a load pass.
    PluginLoaded { key: String, name: String },
    /// A full load pass finished.
    PluginsLoaded { report: LoadReport },
    /// A load pass hit a failure that escaped per-directory isolation.
    PluginsError { message: String },
    /// A plugin was installed at runtime.
    Installed { name: String, version: String },
    /// A plugin was uninstalled at runtime.
    Uninstalled { name: String },
    /// A plugin's persisted record was patched.
    Updated { name: String },
    /// A periodic health sweep completed.
    Health { report: HealthReport },
}
