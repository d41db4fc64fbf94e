//! Catch-all plugin route dispatcher
//!
//! Requests that match no fixed API route land here. The path is looked up
//! in the host's live route table at request time, so plugin routes appear
//! the moment a plugin is installed and vanish the moment it is removed.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use nexus_core::PluginHostError;
use nexus_plugin_api::{HttpMethod, RouteRequest};
use serde_json::json;

use crate::AppState;

/// Convert an axum method to a plugin HttpMethod
fn to_http_method(method: &axum::http::Method) -> Option<HttpMethod> {
    match *method {
        axum::http::Method::GET => Some(HttpMethod::Get),
        axum::http::Method::POST => Some(HttpMethod::Post),
        axum::http::Method::PUT => Some(HttpMethod::Put),
        axum::http::Method::DELETE => Some(HttpMethod::Delete),
        axum::http::Method::PATCH => Some(HttpMethod::Patch),
        _ => None,
    }
}

/// Dispatch an unmatched request to the owning plugin, if any
pub async fn handle_plugin_route(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let Some(method) = to_http_method(request.method()) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    };

    let path = request.uri().path().to_string();
    let query = parse_query(request.uri().query());
    let headers = extract_headers(request.headers());

    let body = match axum::body::to_bytes(request.into_body(), 1024 * 1024).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Failed to read body").into_response();
        }
    };

    let route_request = RouteRequest {
        params: HashMap::new(),
        query,
        body,
        headers,
    };

    let result = {
        let mut host = state.plugin_host.write().await;
        host.dispatch_route(method, &path, route_request)
    };

    match result {
        Ok(resp) => Response::builder()
            .status(resp.status)
            .header("Content-Type", resp.content_type)
            .body(Body::from(resp.body))
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP response: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }),
        Err(PluginHostError::RouteNotFound { .. }) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "not found" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /plugins/:name/view - serve a plugin's view template
pub async fn plugin_view(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let content = {
        let host = state.plugin_host.read().await;
        host.view_content(&name)
    };

    match content {
        Ok(markup) => Html(markup).into_response(),
        Err(PluginHostError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": format!("no view for plugin '{name}'") })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
        .collect()
}
