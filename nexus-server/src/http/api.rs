//! REST API handlers for plugin queries

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nexus_core::{EventBus, EventSeq, HealthReport, PluginEvent};
use nexus_plugin_api::{PluginCategory, PluginDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Plugins in the registry
    pub plugins_total: usize,
    /// Plugins flagged active
    pub plugins_active: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let host = state.plugin_host.read().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        plugins_total: host.registry().len(),
        plugins_active: host.registry().active_count(),
    })
}

/// Filters for the plugin list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PluginListParams {
    /// Free-text search over name, description, and tags
    pub q: Option<String>,
    /// Restrict to one category (active plugins only)
    pub category: Option<String>,
    /// Restrict to the featured subset
    pub featured: Option<bool>,
}

/// Response for listing plugins
#[derive(Debug, Serialize, Deserialize)]
pub struct PluginListResponse {
    /// Matching plugins
    pub plugins: Vec<PluginDescriptor>,
}

/// List plugins, optionally filtered by search text, category, or featured
/// flag.
pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PluginListParams>,
) -> Response {
    let host = state.plugin_host.read().await;
    let registry = host.registry();

    let plugins: Vec<PluginDescriptor> = if let Some(q) = &params.q {
        registry.search(q).into_iter().cloned().collect()
    } else if let Some(category) = &params.category {
        match PluginCategory::parse(category) {
            Some(category) => registry.by_category(category).into_iter().cloned().collect(),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("unknown category: {category}") })),
                )
                    .into_response();
            }
        }
    } else if params.featured.unwrap_or(false) {
        registry.featured().into_iter().cloned().collect()
    } else {
        registry.descriptors().into_iter().cloned().collect()
    };

    Json(PluginListResponse { plugins }).into_response()
}

/// Response for the category listing
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    /// Distinct categories currently present
    pub categories: Vec<String>,
}

/// Distinct categories present in the registry
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<CategoriesResponse> {
    let host = state.plugin_host.read().await;
    Json(CategoriesResponse {
        categories: host
            .registry()
            .categories()
            .into_iter()
            .map(|c| c.to_string())
            .collect(),
    })
}

/// Look up one plugin by name
pub async fn get_plugin(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let host = state.plugin_host.read().await;
    match host.registry().by_name(&name) {
        Some(entry) => Json(entry.descriptor.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("plugin '{name}' not found") })),
        )
            .into_response(),
    }
}

/// Current health report, computed on demand
pub async fn plugin_status(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let host = state.plugin_host.read().await;
    Json(host.check_health())
}

/// Parameters for event polling
#[derive(Debug, Default, Deserialize)]
pub struct EventParams {
    /// Replay events from this sequence number (default 0)
    pub since: Option<EventSeq>,
}

/// One replayed event with its sequence number
#[derive(Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub seq: EventSeq,
    pub event: PluginEvent,
}

/// Response for event polling
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    /// High water mark; poll again with `since=current_seq`
    pub current_seq: EventSeq,
    /// Events at or after the requested sequence number
    pub events: Vec<EventEnvelope>,
}

/// Poll lifecycle events, replaying from a sequence number so late joiners
/// can catch up.
pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventParams>,
) -> Json<EventsResponse> {
    let since = params.since.unwrap_or(0);
    let events = state
        .event_bus
        .events_from(since)
        .await
        .into_iter()
        .map(|(seq, event)| EventEnvelope { seq, event })
        .collect();

    Json(EventsResponse {
        current_seq: state.event_bus.current_seq(),
        events,
    })
}
