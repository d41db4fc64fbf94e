//! Live dispatch table for plugin HTTP routes
//!
//! The web layer matches every candidate request against this table at
//! request time, so withdrawing a plugin's routes takes effect on the next
//! request; nothing is ever bound permanently into the router.

use std::collections::HashMap;

use nexus_plugin_api::{HttpMethod, RouteSpec};

/// Registry of all dispatchable plugin routes.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<RegisteredRoute>,
}

/// A route owned by a registered plugin.
pub struct RegisteredRoute {
    /// Identity key of the owning plugin.
    pub plugin_key: String,
    /// Name of the owning plugin.
    pub plugin_name: String,
    /// Route specification.
    pub spec: RouteSpec,
    /// Compiled path matcher.
    matcher: PathMatcher,
}

/// Simple path matcher supporting `:param` patterns.
struct PathMatcher {
    segments: Vec<PathSegment>,
}

enum PathSegment {
    Literal(String),
    Param(String),
}

impl PathMatcher {
    fn new(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix(':') {
                    PathSegment::Param(name.to_string())
                } else {
                    PathSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self { segments }
    }

    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (segment, part) in self.segments.iter().zip(path_parts.iter()) {
            match segment {
                PathSegment::Literal(expected) => {
                    if expected != *part {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }

        Some(params)
    }
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register routes for a plugin identified by key and name.
    pub fn register(&mut self, plugin_key: &str, plugin_name: &str, specs: Vec<RouteSpec>) {
        for spec in specs {
            let matcher = PathMatcher::new(&spec.path);
            self.routes.push(RegisteredRoute {
                plugin_key: plugin_key.to_string(),
                plugin_name: plugin_name.to_string(),
                spec,
                matcher,
            });
        }
    }

    /// Check whether a spec collides with an existing registration.
    ///
    /// Returns the name of the plugin that owns the conflicting route, if any.
    pub fn check_conflict(&self, spec: &RouteSpec) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.spec.method == spec.method && r.spec.path == spec.path)
            .map(|r| r.plugin_name.as_str())
    }

    /// Find a route matching the given method and path.
    ///
    /// Returns the route and extracted path parameters.
    pub fn match_route(
        &self,
        method: HttpMethod,
        path: &str,
    ) -> Option<(&RegisteredRoute, HashMap<String, String>)> {
        for route in &self.routes {
            if route.spec.method == method
                && let Some(params) = route.matcher.match_path(path)
            {
                return Some((route, params));
            }
        }
        None
    }

    /// Withdraw all routes owned by a plugin name.
    pub fn unregister(&mut self, plugin_name: &str) {
        self.routes.retain(|r| r.plugin_name != plugin_name);
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Drop every route (start of a load pass).
    pub fn clear(&mut self) {
        self.routes.clear();
    }
}
