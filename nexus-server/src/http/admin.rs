//! Admin lifecycle endpoints
//!
//! Every handler here consults the admin gate before touching the host, and
//! every failure comes back as the structured `{success, error, message}`
//! shape so the UI can branch without parsing prose.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use nexus_core::{LifecycleError, PluginHostError, PluginPatch};
use nexus_plugin_api::{PluginDescriptor, RawDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

/// Install request body
#[derive(Debug, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Untrusted descriptor candidate
    pub descriptor: RawDescriptor,
    /// Optional base64-encoded binary artifact
    #[serde(default)]
    pub artifact: Option<String>,
}

/// Structured result of a lifecycle operation
#[derive(Debug, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDescriptor>,
}

impl LifecycleResponse {
    fn ok(plugin: Option<PluginDescriptor>) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            plugin,
        }
    }
}

fn failure(err: &LifecycleError) -> Response {
    let status = match err.kind() {
        "invalid_config" => StatusCode::UNPROCESSABLE_ENTITY,
        "conflict" => StatusCode::CONFLICT,
        "not_found" => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(LifecycleResponse {
            success: false,
            error: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            plugin: None,
        }),
    )
        .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "unauthorized" })),
    )
        .into_response()
}

/// POST /api/plugins/install - install a plugin at runtime
pub async fn install(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<InstallRequest>,
) -> Response {
    if !state.admin.resolve(&headers).can_manage_plugins() {
        return unauthorized();
    }

    let artifact = match &body.artifact {
        Some(encoded) => match BASE64.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": "invalid_artifact",
                        "message": e.to_string(),
                    })),
                )
                    .into_response();
            }
        },
        None => None,
    };

    let result = {
        let mut host = state.plugin_host.write().await;
        host.install(body.descriptor, artifact.as_deref()).await
    };

    match result {
        Ok(descriptor) => (
            StatusCode::CREATED,
            Json(LifecycleResponse::ok(Some(descriptor))),
        )
            .into_response(),
        Err(e) => failure(&e),
    }
}

/// DELETE /api/plugins/:name - uninstall a plugin
pub async fn uninstall(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if !state.admin.resolve(&headers).can_manage_plugins() {
        return unauthorized();
    }

    let result = {
        let mut host = state.plugin_host.write().await;
        host.uninstall(&name).await
    };

    match result {
        Ok(()) => Json(LifecycleResponse::ok(None)).into_response(),
        Err(e) => failure(&e),
    }
}

/// PATCH /api/plugins/:name - merge a partial update into a plugin
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(patch): Json<PluginPatch>,
) -> Response {
    if !state.admin.resolve(&headers).can_manage_plugins() {
        return unauthorized();
    }

    let result = {
        let mut host = state.plugin_host.write().await;
        host.update(&name, patch).await
    };

    match result {
        Ok(descriptor) => Json(LifecycleResponse::ok(Some(descriptor))).into_response(),
        Err(e) => failure(&e),
    }
}

/// POST /api/plugins/reload - rerun the full load pass
pub async fn reload(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.admin.resolve(&headers).can_manage_plugins() {
        return unauthorized();
    }

    let result = {
        let mut host = state.plugin_host.write().await;
        host.load_all().await
    };

    match result {
        Ok(report) => Json(report).into_response(),
        Err(PluginHostError::LoadInProgress) => (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "load_in_progress" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "internal", "message": e.to_string() })),
        )
            .into_response(),
    }
}

/// POST /api/plugins/backup - snapshot the registry to the backup area
pub async fn backup(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !state.admin.resolve(&headers).can_manage_plugins() {
        return unauthorized();
    }

    let result = {
        let host = state.plugin_host.read().await;
        host.backup()
    };

    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => failure(&e),
    }
}
