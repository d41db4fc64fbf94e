//! HTTP server module

mod admin;
mod api;
mod dispatch;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::AppState;

pub use admin::{InstallRequest, LifecycleResponse};
pub use api::{
    CategoriesResponse, EventEnvelope, EventsResponse, HealthResponse, PluginListResponse,
};

/// Create the HTTP router with all routes configured
///
/// Anything that matches no fixed route falls through to the plugin
/// dispatcher.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/plugins", get(api::list_plugins))
        .route("/api/plugins/categories", get(api::categories))
        .route("/api/plugins/status", get(api::plugin_status))
        .route("/api/plugins/events", get(api::events))
        .route("/api/plugins/install", post(admin::install))
        .route("/api/plugins/reload", post(admin::reload))
        .route("/api/plugins/backup", post(admin::backup))
        .route(
            "/api/plugins/:name",
            get(api::get_plugin)
                .delete(admin::uninstall)
                .patch(admin::update),
        )
        .route("/plugins/:name/view", get(dispatch::plugin_view))
        .fallback(dispatch::handle_plugin_route)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}
