//! Plugin descriptor types and metadata structures

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form structured map carried opaquely on a descriptor.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Fixed set of categories a plugin may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    Analytics,
    Content,
    Integration,
    Security,
    Utility,
    Workflow,
}

impl PluginCategory {
    /// All categories, in display order.
    pub const ALL: [PluginCategory; 6] = [
        PluginCategory::Analytics,
        PluginCategory::Content,
        PluginCategory::Integration,
        PluginCategory::Security,
        PluginCategory::Utility,
        PluginCategory::Workflow,
    ];

    /// The wire/catalog name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginCategory::Analytics => "analytics",
            PluginCategory::Content => "content",
            PluginCategory::Integration => "integration",
            PluginCategory::Security => "security",
            PluginCategory::Utility => "utility",
            PluginCategory::Workflow => "workflow",
        }
    }

    /// Parse a category from its wire name. Case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authoritative unit of extensibility.
///
/// A descriptor is only ever constructed by [`validate`](crate::validate)
/// (from an untrusted [`RawDescriptor`]) or read back from the persisted
/// catalog, so holding one implies the required-field and grammar checks
/// have passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name, the case-sensitive half of the identity key.
    pub name: String,
    /// Version string, `MAJOR.MINOR.(PATCH|*)`.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Primary route, lowercase-kebab segments starting with `/`.
    pub route: String,
    /// Declared category.
    pub category: PluginCategory,
    /// Whether the plugin is currently registered and routable.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Promoted in discovery listings.
    #[serde(default)]
    pub featured: bool,
    /// External module names this plugin's code needs (soft-checked).
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Free-form labels included in registry search.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Set by the lifecycle manager on install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    /// Refreshed by the lifecycle manager on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether a view template was found for this plugin.
    #[serde(default)]
    pub has_view: bool,
    // The opaque maps serialize as TOML tables, so they stay last
    /// Opaque configuration map.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub config: JsonMap,
    /// Opaque settings map.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub settings: JsonMap,
    /// Opaque metadata map.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub metadata: JsonMap,
}

fn default_active() -> bool {
    true
}

impl PluginDescriptor {
    /// The registry identity key, `name@version`.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Filesystem-safe directory name derived from the plugin name.
    ///
    /// Lowercased, with runs of non-alphanumeric characters collapsed to a
    /// single `-` and leading/trailing dashes stripped.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut last_dash = true;
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }
}

/// An untrusted descriptor candidate, as parsed from a `plugin.toml` file or
/// an install request body.
///
/// Every field is optional here; only [`validate`](crate::validate) turns a
/// `RawDescriptor` into a [`PluginDescriptor`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(default)]
    pub settings: JsonMap,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl RawDescriptor {
    /// Parse a candidate from descriptor-file TOML.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
