//! Caller context for admin operations
//!
//! The web layer resolves each request to an [`AuthContext`] and consults it
//! before lifecycle operations proceed. The core never authenticates anyone
//! itself.

use serde::{Deserialize, Serialize};

/// Identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier (token label, user id, email).
    pub subject: String,
    /// Display name, when known.
    pub name: Option<String>,
}

/// Where a request came from and what it may do.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    /// Request from the local machine with no admin gate configured.
    Local,
    /// Request that passed the admin gate.
    Authenticated { identity: Identity },
    /// Request that presented no acceptable credentials.
    Anonymous,
}

impl AuthContext {
    /// Whether this caller may install, update, or uninstall plugins.
    pub fn can_manage_plugins(&self) -> bool {
        !matches!(self, AuthContext::Anonymous)
    }
}
