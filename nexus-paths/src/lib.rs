//! XDG Base Directory paths for NexusCore.
//!
//! Server and CLI share these helpers so config, plugins, and uploads land
//! in the same place regardless of entry point.

use std::path::PathBuf;

/// Get the nexus config directory.
///
/// Returns `$XDG_CONFIG_HOME/nexus` if set, otherwise `~/.config/nexus`.
/// This is where server configuration lives.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("nexus")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/nexus")
    } else {
        PathBuf::from(".config/nexus")
    }
}

/// Get the nexus data directory.
///
/// Returns `$XDG_DATA_HOME/nexus` if set, otherwise `~/.local/share/nexus`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("nexus")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/nexus")
    } else {
        PathBuf::from(".local/share/nexus")
    }
}

/// The plugins root: each subdirectory is one candidate plugin.
pub fn plugins_dir() -> PathBuf {
    data_dir().join("plugins")
}

/// The uploads root, holding the `temp` and `backup` areas.
pub fn uploads_dir() -> PathBuf {
    data_dir().join("uploads")
}
