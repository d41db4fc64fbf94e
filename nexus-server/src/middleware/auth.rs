//! Admin authorization
//!
//! The server is the component that decides who a caller is; the core only
//! asks [`AuthContext::can_manage_plugins`]. With no token configured every
//! caller is treated as local, which matches single-machine development
//! deployments.

use axum::http::HeaderMap;
use nexus_core::{AuthContext, Identity};

/// Bearer-token admin gate.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    token: Option<String>,
}

impl AdminAuth {
    /// Gate lifecycle operations behind a shared token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// No gate: every caller counts as local.
    pub fn disabled() -> Self {
        Self { token: None }
    }

    /// Resolve a request's headers to a caller context.
    pub fn resolve(&self, headers: &HeaderMap) -> AuthContext {
        let Some(expected) = &self.token else {
            return AuthContext::Local;
        };

        match bearer_token(headers) {
            Some(presented) if presented == *expected => AuthContext::Authenticated {
                identity: Identity {
                    subject: "admin-token".to_string(),
                    name: None,
                },
            },
            _ => AuthContext::Anonymous,
        }
    }
}

/// Extract a bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_gate_is_local() {
        let auth = AdminAuth::disabled();
        assert_eq!(auth.resolve(&HeaderMap::new()), AuthContext::Local);
    }

    #[test]
    fn test_matching_token_authenticates() {
        let auth = AdminAuth::with_token("secret");
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer secret".parse().expect("header"),
        );
        assert!(auth.resolve(&headers).can_manage_plugins());
    }

    #[test]
    fn test_wrong_token_is_anonymous() {
        let auth = AdminAuth::with_token("secret");
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong".parse().expect("header"),
        );
        assert_eq!(auth.resolve(&headers), AuthContext::Anonymous);
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let auth = AdminAuth::with_token("secret");
        assert_eq!(auth.resolve(&HeaderMap::new()), AuthContext::Anonymous);
    }
}
