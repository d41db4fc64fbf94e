//! HTTP types crossing the host/plugin boundary

use std::collections::HashMap;

use serde::Serialize;

use crate::error::PluginError;

/// HTTP method for route registration and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

/// Specification for a single dispatchable route.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute path pattern, e.g. `/alpha` or `/alpha/items/:id`.
    pub path: String,
}

impl RouteSpec {
    /// A GET route for the given path.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
        }
    }

    /// A POST route for the given path.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
        }
    }
}

/// Incoming request handed to a plugin handler.
#[derive(Debug, Default)]
pub struct RouteRequest {
    /// Path parameters extracted from the route pattern (`:id` -> `"123"`).
    pub params: HashMap<String, String>,
    /// Query parameters.
    pub query: HashMap<String, String>,
    /// Request body bytes.
    pub body: Vec<u8>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

/// Response produced by a plugin handler.
#[derive(Debug)]
pub struct RouteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Content-Type header value.
    pub content_type: String,
}

impl RouteResponse {
    /// A JSON response from any serializable value.
    pub fn json<T: Serialize>(status: u16, data: &T) -> Result<Self, PluginError> {
        Ok(Self {
            status,
            body: serde_json::to_vec(data).map_err(|e| PluginError::Json(e.to_string()))?,
            content_type: "application/json".to_string(),
        })
    }

    /// A plain-text response.
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: text.into().into_bytes(),
            content_type: "text/plain".to_string(),
        }
    }

    /// An HTML response.
    pub fn html(status: u16, markup: impl Into<String>) -> Self {
        Self {
            status,
            body: markup.into().into_bytes(),
            content_type: "text/html".to_string(),
        }
    }

    /// An empty response with just a status code.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_type: "application/json".to_string(),
        }
    }
}
