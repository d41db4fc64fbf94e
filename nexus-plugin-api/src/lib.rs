//! nexus-plugin-api - Plugin API for the NexusCore application server
//!
//! This crate provides the types needed to describe and implement NexusCore
//! plugins. A plugin is described by a [`PluginDescriptor`] (parsed from a
//! `plugin.toml` file or a persisted catalog record) and optionally backed by
//! a [`PluginHandler`] implementation that serves its HTTP routes.
//!
//! Handlers are ordinary Rust values registered into the host's handler table
//! at startup; there is no dynamic code loading. A plugin without a handler
//! is still discoverable and queryable, it just has nothing to dispatch to.
//!
//! # Example
//!
//! ```
//! use nexus_plugin_api::{
//!     PluginError, PluginHandler, RouteRequest, RouteResponse,
//! };
//!
//! struct StatusHandler;
//!
//! impl PluginHandler for StatusHandler {
//!     fn handle(&self, _request: RouteRequest) -> Result<RouteResponse, PluginError> {
//!         Ok(RouteResponse::text(200, "ok"))
//!     }
//! }
//! ```

pub mod descriptor;
pub mod error;
pub mod http;
pub mod validate;

pub use descriptor::{JsonMap, PluginCategory, PluginDescriptor, RawDescriptor};
pub use error::PluginError;
pub use http::{HttpMethod, RouteRequest, RouteResponse, RouteSpec};
pub use validate::{ValidationIssue, route_is_valid, validate};

/// The capability interface implemented by plugin code.
///
/// The host keys handler instances by plugin name; when a descriptor with a
/// matching name is loaded, the handler is attached to it and its routes are
/// entered into the live dispatch table.
///
/// Only [`handle`](PluginHandler::handle) is required; the other methods have
/// defaults for plugins that serve a single route and ship no view.
pub trait PluginHandler: Send + Sync {
    /// Contribute routes beyond the descriptor's primary route.
    ///
    /// Paths pushed here are absolute and may use `:param` segments
    /// (e.g. `/reports/monthly/:month`).
    fn register_routes(&self, _routes: &mut Vec<RouteSpec>, _descriptor: &PluginDescriptor) {}

    /// Serve a request dispatched to one of this plugin's routes.
    fn handle(&self, request: RouteRequest) -> Result<RouteResponse, PluginError>;

    /// Whether this plugin provides a renderable view.
    fn has_view(&self) -> bool {
        false
    }
}
