//! Plugin subsystem error types

use std::path::PathBuf;

use nexus_plugin_api::{HttpMethod, ValidationIssue};
use thiserror::Error;

use super::store::StoreError;

/// Errors from the load pass and route dispatch.
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// A load pass is already running; the clear-then-repopulate sequence
    /// must not interleave.
    #[error("a plugin load pass is already in progress")]
    LoadInProgress,

    /// Descriptor file could not be read
    #[error("descriptor unreadable at {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file could not be parsed
    #[error("descriptor parse failure at {path}: {message}")]
    DescriptorParse { path: PathBuf, message: String },

    /// Descriptor failed validation
    #[error("invalid descriptor in {dir}: {}", join_issues(.issues))]
    InvalidDescriptor {
        dir: PathBuf,
        issues: Vec<ValidationIssue>,
    },

    /// A route is already owned by another plugin
    #[error("route {route} already registered by plugin '{existing}'")]
    RouteConflict { route: String, existing: String },

    /// Plugin not found
    #[error("plugin '{name}' not found")]
    NotFound { name: String },

    /// No dispatch-table entry matches the request
    #[error("no route matches {method:?} {path}")]
    RouteNotFound { method: HttpMethod, path: String },

    /// Plugin is registered but has no executable handler attached
    #[error("plugin '{name}' has no handler")]
    NoHandler { name: String },

    /// Handler returned an error
    #[error("handler error: {0}")]
    Handler(#[from] nexus_plugin_api::PluginError),

    /// Catalog failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned from install/update/uninstall/backup.
///
/// These are the structured results the web layer translates for callers;
/// nothing here escapes the host boundary as a panic.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Descriptor failed validation
    #[error("invalid descriptor: {}", join_issues(.issues))]
    InvalidConfig { issues: Vec<ValidationIssue> },

    /// Name or route collides with an active plugin
    #[error("plugin '{name}' conflicts with active plugin '{existing}'")]
    Conflict { name: String, existing: String },

    /// Target plugin does not exist
    #[error("plugin '{name}' not found")]
    NotFound { name: String },

    /// Catalog failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor or snapshot could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LifecycleError {
    /// Stable machine-readable kind, used by the web layer to pick a status
    /// code and by callers to branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::InvalidConfig { .. } => "invalid_config",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::Store(_) | LifecycleError::Io(_) | LifecycleError::Serialization(_) => {
                "internal"
            }
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
