//! Plugin registry - the in-memory authoritative map of registered plugins
//!
//! Keyed by the identity key `name@version`. The registry is owned by the
//! [`PluginHost`](super::PluginHost) and passed around by reference; there is
//! no global instance.

use std::collections::HashMap;
use std::sync::Arc;

use nexus_plugin_api::{PluginCategory, PluginDescriptor, PluginHandler};

/// Upper bound on the number of plugins surfaced by [`PluginRegistry::featured`].
pub const FEATURED_LIMIT: usize = 6;

/// State of a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginState {
    /// Registered and routable.
    Registered,
    /// Deactivated at runtime; routes are withdrawn.
    Deactivated { reason: String },
    /// Registration succeeded but the plugin later failed.
    Failed { error: String },
}

/// A plugin admitted into the registry.
pub struct RegisteredPlugin {
    /// The validated descriptor.
    pub descriptor: PluginDescriptor,
    /// Executable handler, when one is registered for this plugin's name.
    pub handler: Option<Arc<dyn PluginHandler>>,
    /// Current state.
    pub state: PluginState,
}

impl RegisteredPlugin {
    /// Whether this entry counts as active for queries and conflict checks.
    pub fn is_active(&self) -> bool {
        self.descriptor.active && self.state == PluginState::Registered
    }
}

/// In-memory map of registered plugins keyed by `name@version`.
#[derive(Default)]
pub struct PluginRegistry {
    entries: HashMap<String, RegisteredPlugin>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry under its identity key.
    ///
    /// First registration wins: if the key is already present this is a
    /// no-op and returns false.
    pub fn insert(&mut self, entry: RegisteredPlugin) -> bool {
        let key = entry.descriptor.identity();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Whether an identity key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up an entry by identity key.
    pub fn get(&self, key: &str) -> Option<&RegisteredPlugin> {
        self.entries.get(key)
    }

    /// Mutable lookup by identity key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut RegisteredPlugin> {
        self.entries.get_mut(key)
    }

    /// Remove an entry by identity key.
    pub fn remove(&mut self, key: &str) -> Option<RegisteredPlugin> {
        self.entries.remove(key)
    }

    /// The identity key registered for a plugin name, if any.
    pub fn key_for_name(&self, name: &str) -> Option<String> {
        self.entries
            .values()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.descriptor.identity())
    }

    /// Look up an entry by plugin name.
    pub fn by_name(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.entries.values().find(|e| e.descriptor.name == name)
    }

    /// Look up an entry by its primary route.
    pub fn by_route(&self, route: &str) -> Option<&RegisteredPlugin> {
        self.entries.values().find(|e| e.descriptor.route == route)
    }

    /// Active plugins in a category, sorted by name.
    pub fn by_category(&self, category: PluginCategory) -> Vec<&PluginDescriptor> {
        let mut matches: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.is_active() && e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    /// Case-insensitive substring search over name, description, and tags,
    /// sorted by name.
    pub fn search(&self, query: &str) -> Vec<&PluginDescriptor> {
        let query = query.to_lowercase();
        let mut matches: Vec<_> = self
            .entries
            .values()
            .map(|e| &e.descriptor)
            .filter(|d| {
                d.name.to_lowercase().contains(&query)
                    || d.description.to_lowercase().contains(&query)
                    || d.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    /// Distinct categories present in the registry, sorted.
    pub fn categories(&self) -> Vec<PluginCategory> {
        let mut categories: Vec<_> = self
            .entries
            .values()
            .map(|e| e.descriptor.category)
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Active, featured plugins, sorted by name and capped at
    /// [`FEATURED_LIMIT`].
    pub fn featured(&self) -> Vec<&PluginDescriptor> {
        let mut matches: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.is_active() && e.descriptor.featured)
            .map(|e| &e.descriptor)
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches.truncate(FEATURED_LIMIT);
        matches
    }

    /// All descriptors, sorted by identity key.
    pub fn descriptors(&self) -> Vec<&PluginDescriptor> {
        let mut all: Vec<_> = self.entries.values().map(|e| &e.descriptor).collect();
        all.sort_by_key(|d| d.identity());
        all
    }

    /// Iterate over (key, entry) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredPlugin)> {
        self.entries.iter()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of active plugins.
    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_active()).count()
    }

    /// Drop every entry (start of a load pass).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
