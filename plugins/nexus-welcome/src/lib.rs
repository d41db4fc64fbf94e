//! nexus-welcome - the built-in welcome plugin
//!
//! A small first-party plugin that greets callers. It doubles as the
//! reference implementation of [`PluginHandler`]: one primary route, one
//! contributed parameterized route, nothing else.

use chrono::Utc;
use nexus_plugin_api::{
    PluginDescriptor, PluginError, PluginHandler, RawDescriptor, RouteRequest, RouteResponse,
    RouteSpec,
};
use serde_json::json;

/// Handler behind the `Welcome` plugin.
pub struct WelcomeHandler {
    greeting: String,
}

impl WelcomeHandler {
    /// Handler with the stock greeting.
    pub fn new() -> Self {
        Self {
            greeting: "Welcome to NexusCore".to_string(),
        }
    }

    /// Handler with a custom greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }
}

impl Default for WelcomeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginHandler for WelcomeHandler {
    fn register_routes(&self, routes: &mut Vec<RouteSpec>, descriptor: &PluginDescriptor) {
        routes.push(RouteSpec::get(format!("{}/greet/:name", descriptor.route)));
    }

    fn handle(&self, request: RouteRequest) -> Result<RouteResponse, PluginError> {
        let message = match request.params.get("name") {
            Some(name) => format!("{}, {}!", self.greeting, name),
            None => self.greeting.clone(),
        };

        RouteResponse::json(
            200,
            &json!({
                "message": message,
                "plugin": "Welcome",
                "served_at": Utc::now().to_rfc3339(),
            }),
        )
    }
}

/// The descriptor `nexus serve` installs when no welcome plugin exists yet.
pub fn default_descriptor() -> RawDescriptor {
    RawDescriptor {
        name: Some("Welcome".to_string()),
        version: Some("1.0.0".to_string()),
        description: Some("Greets callers and proves the plugin pipeline works".to_string()),
        route: Some("/welcome".to_string()),
        category: Some("content".to_string()),
        featured: Some(true),
        tags: vec!["builtin".to_string(), "demo".to_string()],
        ..Default::default()
    }
}
