//! Per-plugin runtime bookkeeping
//!
//! One [`PluginCacheEntry`] per registered identity key. Entries are created
//! by the loader and mutated only by the dispatch path; the health monitor
//! reads them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime counters for one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginCacheEntry {
    /// When the plugin was (last) loaded.
    pub loaded_at: DateTime<Utc>,
    /// Requests dispatched to this plugin.
    pub request_count: u64,
    /// Handler errors recorded for this plugin.
    pub error_count: u64,
    /// Last time a request was dispatched.
    pub last_used: Option<DateTime<Utc>>,
}

impl PluginCacheEntry {
    fn new() -> Self {
        Self {
            loaded_at: Utc::now(),
            request_count: 0,
            error_count: 0,
            last_used: None,
        }
    }
}

/// Map of runtime counters keyed by identity key.
#[derive(Debug, Default)]
pub struct PluginCache {
    entries: HashMap<String, PluginCacheEntry>,
}

impl PluginCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh entry for a key. A reload replaces the old counters.
    pub fn create(&mut self, key: &str) {
        self.entries.insert(key.to_string(), PluginCacheEntry::new());
    }

    /// Read a key's counters.
    pub fn get(&self, key: &str) -> Option<&PluginCacheEntry> {
        self.entries.get(key)
    }

    /// Record a dispatched request.
    pub fn record_request(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.request_count += 1;
            entry.last_used = Some(Utc::now());
        }
    }

    /// Record a handler error.
    pub fn record_error(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.error_count += 1;
        }
    }

    /// Drop a key's counters.
    pub fn remove(&mut self, key: &str) -> Option<PluginCacheEntry> {
        self.entries.remove(key)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (start of a load pass).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_initializes_counters() {
        let mut cache = PluginCache::new();
        cache.create("Alpha@1.0.0");

        let entry = cache.get("Alpha@1.0.0").expect("entry");
        assert_eq!(entry.request_count, 0);
        assert_eq!(entry.error_count, 0);
        assert!(entry.last_used.is_none());
    }

    #[test]
    fn test_record_request_bumps_count_and_last_used() {
        let mut cache = PluginCache::new();
        cache.create("Alpha@1.0.0");
        cache.record_request("Alpha@1.0.0");
        cache.record_request("Alpha@1.0.0");

        let entry = cache.get("Alpha@1.0.0").expect("entry");
        assert_eq!(entry.request_count, 2);
        assert!(entry.last_used.is_some());
        assert_eq!(entry.error_count, 0);
    }

    #[test]
    fn test_record_error_bumps_error_count() {
        let mut cache = PluginCache::new();
        cache.create("Alpha@1.0.0");
        cache.record_error("Alpha@1.0.0");

        assert_eq!(cache.get("Alpha@1.0.0").expect("entry").error_count, 1);
    }

    #[test]
    fn test_record_for_unknown_key_is_noop() {
        let mut cache = PluginCache::new();
        cache.record_request("ghost@0.0.1");
        cache.record_error("ghost@0.0.1");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_create_replaces_existing_counters() {
        let mut cache = PluginCache::new();
        cache.create("Alpha@1.0.0");
        cache.record_request("Alpha@1.0.0");
        cache.create("Alpha@1.0.0");

        assert_eq!(cache.get("Alpha@1.0.0").expect("entry").request_count, 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = PluginCache::new();
        cache.create("Alpha@1.0.0");
        cache.create("Beta@1.0.0");
        assert_eq!(cache.len(), 2);

        assert!(cache.remove("Alpha@1.0.0").is_some());
        cache.clear();
        assert!(cache.is_empty());
    }
}
