//! Error type for plugin handler authors

use thiserror::Error;

/// Errors a plugin handler can return from its entry points.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("json error: {0}")]
    Json(String),

    /// Request targeted a route this handler does not serve
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// Bad request input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything else, with a message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
