//! Persisted plugin catalog
//!
//! The catalog is the record store the loader reads first and the lifecycle
//! manager writes through. The core only sees the [`PluginStore`] trait;
//! [`FilePluginStore`] keeps a TOML catalog on disk and
//! [`MemoryPluginStore`] backs tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_plugin_api::{JsonMap, PluginCategory, PluginDescriptor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Catalog errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Catalog file could not be parsed
    #[error("catalog parse error: {0}")]
    Parse(String),

    /// Catalog could not be serialized
    #[error("catalog serialize error: {0}")]
    Serialize(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One persisted catalog row.
///
/// The free-form descriptor maps are stored as serialized JSON text, so the
/// catalog format stays flat regardless of what plugins put in them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub name: String,
    pub version: String,
    pub description: String,
    pub route: String,
    pub category: PluginCategory,
    pub active: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub config_json: String,
    #[serde(default)]
    pub settings_json: String,
    #[serde(default)]
    pub metadata_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PluginRecord {
    /// Build a record from a validated descriptor.
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            description: descriptor.description.clone(),
            route: descriptor.route.clone(),
            category: descriptor.category,
            active: descriptor.active,
            featured: descriptor.featured,
            dependencies: descriptor.dependencies.clone(),
            tags: descriptor.tags.clone(),
            config_json: to_json_text(&descriptor.config),
            settings_json: to_json_text(&descriptor.settings),
            metadata_json: to_json_text(&descriptor.metadata),
            installed_at: descriptor.installed_at,
            last_updated: descriptor.last_updated,
        }
    }

    /// Reconstruct a descriptor from this record.
    ///
    /// Unparsable map text degrades to an empty map rather than failing the
    /// load pass.
    pub fn to_descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            route: self.route.clone(),
            category: self.category,
            active: self.active,
            featured: self.featured,
            dependencies: self.dependencies.clone(),
            tags: self.tags.clone(),
            config: from_json_text(&self.config_json),
            settings: from_json_text(&self.settings_json),
            metadata: from_json_text(&self.metadata_json),
            installed_at: self.installed_at,
            last_updated: self.last_updated,
            has_view: false,
        }
    }
}

fn to_json_text(map: &JsonMap) -> String {
    if map.is_empty() {
        String::new()
    } else {
        serde_json::to_string(map).unwrap_or_default()
    }
}

fn from_json_text(text: &str) -> JsonMap {
    if text.is_empty() {
        JsonMap::new()
    } else {
        serde_json::from_str(text).unwrap_or_default()
    }
}

/// Partial update applied to a persisted record (and mirrored onto the
/// in-memory registry entry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginPatch {
    pub description: Option<String>,
    pub route: Option<String>,
    pub category: Option<PluginCategory>,
    pub active: Option<bool>,
    pub featured: Option<bool>,
    pub dependencies: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub config: Option<JsonMap>,
    pub settings: Option<JsonMap>,
    pub metadata: Option<JsonMap>,
}

impl PluginPatch {
    /// Merge this patch into a catalog record.
    pub fn apply_to_record(&self, record: &mut PluginRecord) {
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(route) = &self.route {
            record.route = route.clone();
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(active) = self.active {
            record.active = active;
        }
        if let Some(featured) = self.featured {
            record.featured = featured;
        }
        if let Some(dependencies) = &self.dependencies {
            record.dependencies = dependencies.clone();
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(config) = &self.config {
            record.config_json = to_json_text(config);
        }
        if let Some(settings) = &self.settings {
            record.settings_json = to_json_text(settings);
        }
        if let Some(metadata) = &self.metadata {
            record.metadata_json = to_json_text(metadata);
        }
    }

    /// Merge this patch into a live descriptor.
    pub fn apply_to_descriptor(&self, descriptor: &mut PluginDescriptor) {
        if let Some(description) = &self.description {
            descriptor.description = description.clone();
        }
        if let Some(route) = &self.route {
            descriptor.route = route.clone();
        }
        if let Some(category) = self.category {
            descriptor.category = category;
        }
        if let Some(active) = self.active {
            descriptor.active = active;
        }
        if let Some(featured) = self.featured {
            descriptor.featured = featured;
        }
        if let Some(dependencies) = &self.dependencies {
            descriptor.dependencies = dependencies.clone();
        }
        if let Some(tags) = &self.tags {
            descriptor.tags = tags.clone();
        }
        if let Some(config) = &self.config {
            descriptor.config = config.clone();
        }
        if let Some(settings) = &self.settings {
            descriptor.settings = settings.clone();
        }
        if let Some(metadata) = &self.metadata {
            descriptor.metadata = metadata.clone();
        }
    }
}

/// Persisted catalog of plugin records, addressed by name.
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// All records flagged active, ordered by (category, name).
    async fn find_active(&self) -> Result<Vec<PluginRecord>, StoreError>;

    /// Look up one record by name.
    async fn find_one(&self, name: &str) -> Result<Option<PluginRecord>, StoreError>;

    /// Insert or replace a record by name.
    async fn upsert(&self, record: PluginRecord) -> Result<(), StoreError>;

    /// Merge a patch into the record with this name, refreshing
    /// `last_updated`. Returns false when no record matched.
    async fn update_where(&self, name: &str, patch: &PluginPatch) -> Result<bool, StoreError>;

    /// Delete the record with this name. Returns false when no record
    /// matched.
    async fn delete_where(&self, name: &str) -> Result<bool, StoreError>;
}

fn sort_active(records: &[PluginRecord]) -> Vec<PluginRecord> {
    let mut active: Vec<_> = records.iter().filter(|r| r.active).cloned().collect();
    active.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
    active
}

/// In-memory catalog for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryPluginStore {
    records: RwLock<Vec<PluginRecord>>,
}

impl MemoryPluginStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStore for MemoryPluginStore {
    async fn find_active(&self) -> Result<Vec<PluginRecord>, StoreError> {
        Ok(sort_active(&self.records.read().await))
    }

    async fn find_one(&self, name: &str) -> Result<Option<PluginRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn upsert(&self, record: PluginRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| r.name == record.name) {
            *existing = record;
        } else {
            records.push(record);
        }
        Ok(())
    }

    async fn update_where(&self, name: &str, patch: &PluginPatch) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.name == name) else {
            return Ok(false);
        };
        patch.apply_to_record(record);
        record.last_updated = Some(Utc::now());
        Ok(true)
    }

    async fn delete_where(&self, name: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.name != name);
        Ok(records.len() != before)
    }
}

/// Catalog file shape on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    plugins: Vec<PluginRecord>,
}

/// TOML-file-backed catalog.
///
/// The whole catalog is held in memory and rewritten on every mutation;
/// a missing file means an empty catalog.
pub struct FilePluginStore {
    path: PathBuf,
    records: RwLock<Vec<PluginRecord>>,
}

impl FilePluginStore {
    /// Open a catalog at the given path, reading it if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let catalog: CatalogFile =
                toml::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))?;
            catalog.plugins
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// The catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, records: &[PluginRecord]) -> Result<(), StoreError> {
        let catalog = CatalogFile {
            plugins: records.to_vec(),
        };
        let content =
            toml::to_string_pretty(&catalog).map_err(|e| StoreError::Serialize(e.to_string()))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[async_trait]
impl PluginStore for FilePluginStore {
    async fn find_active(&self) -> Result<Vec<PluginRecord>, StoreError> {
        Ok(sort_active(&self.records.read().await))
    }

    async fn find_one(&self, name: &str) -> Result<Option<PluginRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn upsert(&self, record: PluginRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| r.name == record.name) {
            *existing = record;
        } else {
            records.push(record);
        }
        self.save(&records)
    }

    async fn update_where(&self, name: &str, patch: &PluginPatch) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.name == name) else {
            return Ok(false);
        };
        patch.apply_to_record(record);
        record.last_updated = Some(Utc::now());
        self.save(&records)?;
        Ok(true)
    }

    async fn delete_where(&self, name: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.name != name);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }
}
