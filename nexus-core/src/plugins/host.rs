//! PluginHost - discovery, lifecycle, and route dispatch
//!
//! The host owns the registry, the live route table, the runtime cache, and
//! the handler table, and coordinates them against the persisted catalog.
//! A load pass reads the catalog first and the plugins directory second;
//! the first source to claim an identity key wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use nexus_plugin_api::{
    HttpMethod, PluginDescriptor, PluginHandler, RawDescriptor, RouteRequest, RouteResponse,
    RouteSpec, route_is_valid, validate,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cache::PluginCache;
use super::error::{LifecycleError, PluginHostError};
use super::registry::{PluginRegistry, PluginState, RegisteredPlugin};
use super::routes::RouteTable;
use super::store::{PluginPatch, PluginRecord, PluginStore};
use crate::events::{EventBus, PluginEvent};

/// Required descriptor file in each plugin directory.
pub const DESCRIPTOR_FILE: &str = "plugin.toml";
/// Optional per-plugin configuration file, merged into the descriptor's
/// config map.
pub const CONFIG_FILE: &str = "config.toml";
/// Optional view template; its presence sets `has_view`.
pub const VIEW_FILE: &str = "view.html";

/// Directory names never treated as plugin candidates.
const RESERVED_DIRS: &[&str] = &["node_modules", "target"];

/// Configuration for PluginHost
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Root directory scanned for plugin subdirectories.
    pub plugins_dir: PathBuf,
    /// Root for uploaded artifacts (`temp`) and registry backups (`backup`).
    pub uploads_dir: PathBuf,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: nexus_paths::plugins_dir(),
            uploads_dir: nexus_paths::uploads_dir(),
        }
    }
}

/// Outcome of one full load pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Plugins in the registry after the pass.
    pub total: usize,
    /// Registered plugins flagged active.
    pub active: usize,
    /// Candidates skipped due to errors (parse, validation, conflict, IO).
    pub errors: usize,
    /// Wall time of the pass.
    pub duration_ms: u64,
}

/// Outcome of a registry backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupReport {
    /// Number of descriptors in the snapshot.
    pub count: usize,
    /// Where the snapshot was written.
    pub path: PathBuf,
}

/// A descriptor that passed every admission check and is ready to commit.
struct Prepared {
    descriptor: PluginDescriptor,
    handler: Option<Arc<dyn PluginHandler>>,
    specs: Vec<RouteSpec>,
}

/// Clears the in-flight flag when a load pass ends, however it ends.
struct LoadGuard {
    flag: Arc<AtomicBool>,
}

impl LoadGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, PluginHostError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PluginHostError::LoadInProgress);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// The plugin host manages discovery, lifecycle operations, and dispatch.
pub struct PluginHost {
    config: PluginHostConfig,
    registry: PluginRegistry,
    routes: RouteTable,
    cache: PluginCache,
    /// Handler implementations keyed by plugin name.
    handlers: HashMap<String, Arc<dyn PluginHandler>>,
    store: Arc<dyn PluginStore>,
    events: Arc<dyn EventBus>,
    loading: Arc<AtomicBool>,
}

impl PluginHost {
    /// Create a host over a catalog and an event bus.
    pub fn new(
        config: PluginHostConfig,
        store: Arc<dyn PluginStore>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            config,
            registry: PluginRegistry::new(),
            routes: RouteTable::new(),
            cache: PluginCache::new(),
            handlers: HashMap::new(),
            store,
            events,
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register an executable handler for a plugin name.
    ///
    /// Must happen before the load pass that should pick it up.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn PluginHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Read access to the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Read access to the runtime cache.
    pub fn cache(&self) -> &PluginCache {
        &self.cache
    }

    /// Host configuration.
    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }

    // ─── Load pass ───────────────────────────────────────────────────

    /// Discover and register all plugins from the catalog and the plugins
    /// directory.
    ///
    /// A full reload: the registry, route table, and cache are rebuilt from
    /// scratch. Per-candidate failures are isolated, logged, and counted;
    /// only a second pass racing this one is an error. A catalog-wide
    /// failure leaves whatever the pass registered before the failure in
    /// place, so callers must treat a report with errors as potentially
    /// partial.
    pub async fn load_all(&mut self) -> Result<LoadReport, PluginHostError> {
        let _guard = LoadGuard::acquire(&self.loading)?;
        let started = Instant::now();

        self.registry.clear();
        self.routes.clear();
        self.cache.clear();

        let mut errors = 0usize;

        // Source A: persisted catalog, ordered by (category, name)
        let active_records = self.store.find_active().await;
        match active_records {
            Ok(records) => {
                for record in records {
                    let descriptor = record.to_descriptor();
                    let key = descriptor.identity();
                    if self.registry.contains(&key) {
                        tracing::debug!(plugin = %key, "already registered, skipping catalog record");
                        continue;
                    }
                    match self.prepare(descriptor, None) {
                        Ok(prepared) => {
                            let name = prepared.descriptor.name.clone();
                            let key = self.commit(prepared);
                            tracing::info!(plugin = %key, source = "catalog", "plugin loaded");
                            self.events
                                .publish(PluginEvent::PluginLoaded { key, name })
                                .await;
                        }
                        Err(e) => {
                            errors += 1;
                            tracing::warn!(plugin = %key, error = %e, "skipping catalog record");
                        }
                    }
                }
            }
            Err(e) => {
                errors += 1;
                tracing::error!(error = %e, "failed to read plugin catalog");
                self.events
                    .publish(PluginEvent::PluginsError {
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        // Source B: plugins directory
        match self.discover_plugin_dirs() {
            Ok(dirs) => {
                for dir in dirs {
                    let outcome = self.load_directory(&dir).await;
                    match outcome {
                        Ok(Some(key)) => {
                            let name = self
                                .registry
                                .get(&key)
                                .map(|e| e.descriptor.name.clone())
                                .unwrap_or_default();
                            tracing::info!(plugin = %key, source = "filesystem", "plugin loaded");
                            self.events
                                .publish(PluginEvent::PluginLoaded { key, name })
                                .await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            errors += 1;
                            tracing::warn!(
                                dir = %dir.display(),
                                error = %e,
                                "skipping plugin directory"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                errors += 1;
                tracing::error!(error = %e, "failed to scan plugins directory");
                self.events
                    .publish(PluginEvent::PluginsError {
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        let report = LoadReport {
            total: self.registry.len(),
            active: self.registry.active_count(),
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            total = report.total,
            active = report.active,
            errors = report.errors,
            duration_ms = report.duration_ms,
            "plugin load pass complete"
        );
        self.events
            .publish(PluginEvent::PluginsLoaded {
                report: report.clone(),
            })
            .await;

        Ok(report)
    }

    /// Candidate plugin directories, sorted by name.
    ///
    /// Hidden, underscore-prefixed, and reserved build-tooling names are
    /// skipped. A missing plugins root is an empty result, not an error.
    fn discover_plugin_dirs(&self) -> Result<Vec<PathBuf>, PluginHostError> {
        let root = &self.config.plugins_dir;
        if !root.exists() {
            tracing::debug!(dir = %root.display(), "plugins directory does not exist");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name.starts_with('_') || RESERVED_DIRS.contains(&name) {
                tracing::debug!(dir = %name, "skipping reserved directory");
                continue;
            }
            found.push(path);
        }

        found.sort();
        Ok(found)
    }

    /// Load one candidate directory.
    ///
    /// `Ok(None)` means the directory was skipped without error (its identity
    /// key was already registered from the catalog).
    async fn load_directory(&mut self, dir: &Path) -> Result<Option<String>, PluginHostError> {
        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        let content = std::fs::read_to_string(&descriptor_path).map_err(|source| {
            PluginHostError::DescriptorRead {
                path: descriptor_path.clone(),
                source,
            }
        })?;

        let raw = RawDescriptor::from_toml(&content).map_err(|e| {
            PluginHostError::DescriptorParse {
                path: descriptor_path.clone(),
                message: e.to_string(),
            }
        })?;

        let mut descriptor = validate(&raw).map_err(|issues| {
            PluginHostError::InvalidDescriptor {
                dir: dir.to_path_buf(),
                issues,
            }
        })?;

        let key = descriptor.identity();
        if self.registry.contains(&key) {
            tracing::debug!(plugin = %key, "identity key already registered, skipping directory");
            return Ok(None);
        }

        self.merge_directory_config(&mut descriptor, dir);

        let prepared = self.prepare(descriptor, Some(dir))?;

        // Filesystem discoveries become persisted going forward
        self.store
            .upsert(PluginRecord::from_descriptor(&prepared.descriptor))
            .await?;

        Ok(Some(self.commit(prepared)))
    }

    /// Merge an optional `config.toml` into the descriptor's config map.
    /// Descriptor-file keys win over directory-config keys.
    fn merge_directory_config(&self, descriptor: &mut PluginDescriptor, dir: &Path) {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return;
        }
        let parsed = std::fs::read_to_string(&config_path)
            .ok()
            .and_then(|content| toml::from_str::<toml::Value>(&content).ok())
            .and_then(|value| serde_json::to_value(value).ok());
        match parsed {
            Some(serde_json::Value::Object(map)) => {
                for (k, v) in map {
                    descriptor.config.entry(k).or_insert(v);
                }
            }
            _ => {
                tracing::warn!(path = %config_path.display(), "unreadable plugin config, ignoring");
            }
        }
    }

    /// Run every admission check for a descriptor without mutating anything.
    fn prepare(
        &self,
        mut descriptor: PluginDescriptor,
        source_dir: Option<&Path>,
    ) -> Result<Prepared, PluginHostError> {
        let handler = self.handlers.get(&descriptor.name).cloned();

        if handler.as_ref().is_some_and(|h| h.has_view()) {
            descriptor.has_view = true;
        }
        let dir = source_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.plugins_dir.join(descriptor.slug()));
        if dir.join(VIEW_FILE).exists() {
            descriptor.has_view = true;
        }

        let specs = self.planned_routes(&descriptor, handler.as_deref());
        for spec in &specs {
            if let Some(existing) = self.routes.check_conflict(spec) {
                return Err(PluginHostError::RouteConflict {
                    route: spec.path.clone(),
                    existing: existing.to_string(),
                });
            }
        }

        // Soft dependency check: missing dependencies warn, never block
        for dep in &descriptor.dependencies {
            if !self.dependency_resolves(dep) {
                tracing::warn!(
                    plugin = %descriptor.name,
                    dependency = %dep,
                    "declared dependency is not resolvable"
                );
            }
        }

        Ok(Prepared {
            descriptor,
            handler,
            specs,
        })
    }

    /// The routes a descriptor would own: its primary route plus whatever
    /// its handler contributes. A plugin without a handler owns no
    /// dispatch-table routes.
    fn planned_routes(
        &self,
        descriptor: &PluginDescriptor,
        handler: Option<&dyn PluginHandler>,
    ) -> Vec<RouteSpec> {
        let Some(handler) = handler else {
            return Vec::new();
        };
        let mut specs = vec![RouteSpec::get(descriptor.route.as_str())];
        handler.register_routes(&mut specs, descriptor);
        specs
    }

    fn dependency_resolves(&self, dep: &str) -> bool {
        self.handlers.contains_key(dep) || self.registry.by_name(dep).is_some()
    }

    /// Enter a prepared descriptor into the route table, cache, and registry.
    fn commit(&mut self, prepared: Prepared) -> String {
        let Prepared {
            descriptor,
            handler,
            specs,
        } = prepared;
        let key = descriptor.identity();
        if !specs.is_empty() {
            self.routes.register(&key, &descriptor.name, specs);
        }
        self.cache.create(&key);
        self.registry.insert(RegisteredPlugin {
            descriptor,
            handler,
            state: PluginState::Registered,
        });
        key
    }

    // ─── Lifecycle operations ────────────────────────────────────────

    /// Install a plugin at runtime.
    ///
    /// The descriptor must validate; its name and route must not collide
    /// with any active plugin. The descriptor file (and any uploaded
    /// artifact) is persisted before the catalog is written, and the
    /// registry is only mutated after persistence succeeds.
    pub async fn install(
        &mut self,
        raw: RawDescriptor,
        artifact: Option<&[u8]>,
    ) -> Result<PluginDescriptor, LifecycleError> {
        let mut descriptor =
            validate(&raw).map_err(|issues| LifecycleError::InvalidConfig { issues })?;

        if let Some(existing) = self.find_active_conflict(&descriptor) {
            return Err(LifecycleError::Conflict {
                name: descriptor.name.clone(),
                existing,
            });
        }

        descriptor.active = true;
        descriptor.installed_at = Some(Utc::now());

        let plugin_name = descriptor.name.clone();
        let prepared = match self.prepare(descriptor, None) {
            Ok(prepared) => prepared,
            Err(PluginHostError::RouteConflict { existing, .. }) => {
                return Err(LifecycleError::Conflict {
                    name: plugin_name,
                    existing,
                });
            }
            Err(PluginHostError::Io(e)) => return Err(LifecycleError::Io(e)),
            Err(e) => return Err(LifecycleError::Serialization(e.to_string())),
        };

        // Persist the descriptor to its own directory
        let plugin_dir = self.config.plugins_dir.join(prepared.descriptor.slug());
        std::fs::create_dir_all(&plugin_dir)?;
        let descriptor_toml = toml::to_string_pretty(&prepared.descriptor)
            .map_err(|e| LifecycleError::Serialization(e.to_string()))?;
        std::fs::write(plugin_dir.join(DESCRIPTOR_FILE), descriptor_toml)?;

        if let Some(bytes) = artifact {
            let temp_dir = self.config.uploads_dir.join("temp");
            std::fs::create_dir_all(&temp_dir)?;
            let artifact_path = temp_dir.join(format!(
                "{}-{}.bin",
                prepared.descriptor.slug(),
                Uuid::new_v4()
            ));
            std::fs::write(&artifact_path, bytes)?;
            tracing::debug!(path = %artifact_path.display(), "stored uploaded artifact");
        }

        self.store
            .upsert(PluginRecord::from_descriptor(&prepared.descriptor))
            .await?;

        let installed = prepared.descriptor.clone();
        let key = self.commit(prepared);
        tracing::info!(plugin = %key, "plugin installed");
        self.events
            .publish(PluginEvent::Installed {
                name: installed.name.clone(),
                version: installed.version.clone(),
            })
            .await;

        Ok(installed)
    }

    /// Uninstall a plugin by name.
    ///
    /// Deactivates the catalog record, removes the registry and cache
    /// entries, and withdraws the plugin's routes; the next request to them
    /// is a 404.
    pub async fn uninstall(&mut self, name: &str) -> Result<(), LifecycleError> {
        let Some(key) = self.registry.key_for_name(name) else {
            return Err(LifecycleError::NotFound {
                name: name.to_string(),
            });
        };

        let patch = PluginPatch {
            active: Some(false),
            ..Default::default()
        };
        if !self.store.update_where(name, &patch).await? {
            // Catalog can lag the registry when an earlier upsert failed;
            // deactivation proceeds regardless
            tracing::warn!(plugin = %name, "no catalog record matched during uninstall");
        }

        self.registry.remove(&key);
        self.routes.unregister(name);
        self.cache.remove(&key);

        tracing::info!(plugin = %key, "plugin uninstalled");
        self.events
            .publish(PluginEvent::Uninstalled {
                name: name.to_string(),
            })
            .await;

        Ok(())
    }

    /// Apply a partial update to a plugin's persisted record and refresh the
    /// in-memory entry for it.
    pub async fn update(
        &mut self,
        name: &str,
        patch: PluginPatch,
    ) -> Result<PluginDescriptor, LifecycleError> {
        if let Some(route) = &patch.route
            && !route_is_valid(route)
        {
            return Err(LifecycleError::InvalidConfig {
                issues: vec![nexus_plugin_api::ValidationIssue::InvalidRoute(
                    route.clone(),
                )],
            });
        }

        if !self.store.update_where(name, &patch).await? {
            return Err(LifecycleError::NotFound {
                name: name.to_string(),
            });
        }

        let mut refreshed = None;
        if let Some(key) = self.registry.key_for_name(name) {
            if let Some(entry) = self.registry.get_mut(&key) {
                patch.apply_to_descriptor(&mut entry.descriptor);
                entry.descriptor.last_updated = Some(Utc::now());
                refreshed = Some((key, entry.descriptor.clone(), entry.handler.clone()));
            }
        }

        let descriptor = match refreshed {
            Some((key, descriptor, handler)) => {
                // Re-derive the dispatch entries: a route change moves them,
                // an active toggle adds or withdraws them
                self.routes.unregister(name);
                if descriptor.active
                    && let Some(handler) = &handler
                {
                    let specs = self.planned_routes(&descriptor, Some(handler.as_ref()));
                    self.routes.register(&key, name, specs);
                }
                descriptor
            }
            None => {
                // Not currently registered (inactive); the catalog is the
                // only thing to refresh
                match self.store.find_one(name).await? {
                    Some(record) => record.to_descriptor(),
                    None => {
                        return Err(LifecycleError::NotFound {
                            name: name.to_string(),
                        });
                    }
                }
            }
        };

        tracing::info!(plugin = %name, "plugin updated");
        self.events
            .publish(PluginEvent::Updated {
                name: name.to_string(),
            })
            .await;

        Ok(descriptor)
    }

    /// Serialize the registry snapshot to a timestamped artifact in the
    /// backup area.
    pub fn backup(&self) -> Result<BackupReport, LifecycleError> {
        let backup_dir = self.config.uploads_dir.join("backup");
        std::fs::create_dir_all(&backup_dir)?;

        let snapshot = self.registry.descriptors();
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let path = backup_dir.join(format!("plugins-backup-{stamp}.json"));
        let body = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| LifecycleError::Serialization(e.to_string()))?;
        std::fs::write(&path, body)?;

        tracing::info!(count = snapshot.len(), path = %path.display(), "registry snapshot written");
        Ok(BackupReport {
            count: snapshot.len(),
            path,
        })
    }

    fn find_active_conflict(&self, descriptor: &PluginDescriptor) -> Option<String> {
        self.registry
            .iter()
            .filter(|(_, e)| e.is_active())
            .find(|(_, e)| {
                e.descriptor.name == descriptor.name || e.descriptor.route == descriptor.route
            })
            .map(|(_, e)| e.descriptor.identity())
    }

    // ─── Dispatch ────────────────────────────────────────────────────

    /// Dispatch a request to the plugin owning the matched route.
    ///
    /// Looks the route up in the live table at call time, so a plugin
    /// removed a moment ago no longer matches. Request and error counters
    /// are recorded against the owning plugin's cache entry.
    pub fn dispatch_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        mut request: RouteRequest,
    ) -> Result<RouteResponse, PluginHostError> {
        let (key, params) = match self.routes.match_route(method, path) {
            Some((route, params)) => (route.plugin_key.clone(), params),
            None => {
                return Err(PluginHostError::RouteNotFound {
                    method,
                    path: path.to_string(),
                });
            }
        };
        request.params = params;

        let Some(entry) = self.registry.get(&key) else {
            return Err(PluginHostError::NotFound { name: key });
        };
        let Some(handler) = entry.handler.clone() else {
            return Err(PluginHostError::NoHandler {
                name: entry.descriptor.name.clone(),
            });
        };

        self.cache.record_request(&key);
        match handler.handle(request) {
            Ok(response) => Ok(response),
            Err(e) => {
                self.cache.record_error(&key);
                tracing::error!(plugin = %key, error = %e, "plugin handler error");
                Err(PluginHostError::Handler(e))
            }
        }
    }

    /// Read a plugin's view template, when it has one.
    pub fn view_content(&self, name: &str) -> Result<String, PluginHostError> {
        let Some(entry) = self.registry.by_name(name) else {
            return Err(PluginHostError::NotFound {
                name: name.to_string(),
            });
        };
        if !entry.descriptor.has_view {
            return Err(PluginHostError::NotFound {
                name: name.to_string(),
            });
        }
        let path = self
            .config
            .plugins_dir
            .join(entry.descriptor.slug())
            .join(VIEW_FILE);
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryEventBus;
    use crate::plugins::store::MemoryPluginStore;
    use nexus_plugin_api::PluginError;
    use tempfile::TempDir;

    struct EchoHandler;

    impl PluginHandler for EchoHandler {
        fn register_routes(&self, routes: &mut Vec<RouteSpec>, descriptor: &PluginDescriptor) {
            routes.push(RouteSpec::get(format!("{}/echo/:word", descriptor.route)));
        }

        fn handle(&self, request: RouteRequest) -> Result<RouteResponse, PluginError> {
            if request.query.contains_key("fail") {
                return Err(PluginError::custom("boom"));
            }
            let word = request
                .params
                .get("word")
                .cloned()
                .unwrap_or_else(|| "ok".to_string());
            Ok(RouteResponse::text(200, word))
        }
    }

    fn write_plugin_dir(root: &Path, dir: &str, descriptor: &str) {
        let plugin_dir = root.join(dir);
        std::fs::create_dir_all(&plugin_dir).expect("mkdir");
        std::fs::write(plugin_dir.join(DESCRIPTOR_FILE), descriptor).expect("write");
    }

    fn alpha_toml() -> &'static str {
        r#"
        name = "Alpha"
        version = "1.0.0"
        description = "First plugin"
        route = "/alpha"
        category = "utility"
        "#
    }

    fn host_with_dirs(tmp: &TempDir) -> PluginHost {
        let config = PluginHostConfig {
            plugins_dir: tmp.path().join("plugins"),
            uploads_dir: tmp.path().join("uploads"),
        };
        PluginHost::new(
            config,
            Arc::new(MemoryPluginStore::new()),
            Arc::new(MemoryEventBus::new(100)),
        )
    }

    fn raw(name: &str, route: &str) -> RawDescriptor {
        RawDescriptor {
            name: Some(name.to_string()),
            version: Some("1.0.0".to_string()),
            description: Some(format!("{name} plugin")),
            route: Some(route.to_string()),
            category: Some("utility".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn load_all_empty_everything() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let report = host.load_all().await.expect("load");
        assert_eq!(report.total, 0);
        assert_eq!(report.active, 0);
        assert_eq!(report.errors, 0);
    }

    #[tokio::test]
    async fn load_all_registers_valid_and_skips_invalid() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        let plugins = tmp.path().join("plugins");

        write_plugin_dir(&plugins, "alpha", alpha_toml());
        // beta is missing its category
        write_plugin_dir(
            &plugins,
            "beta",
            r#"
            name = "Beta"
            version = "1.0.0"
            description = "Second plugin"
            route = "/beta"
            "#,
        );

        let report = host.load_all().await.expect("load");
        assert_eq!(report.total, 1);
        assert!(report.errors >= 1);
        assert!(host.registry().contains("Alpha@1.0.0"));
        assert!(host.registry().by_name("Beta").is_none());
    }

    #[tokio::test]
    async fn load_all_skips_hidden_and_reserved_dirs() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        let plugins = tmp.path().join("plugins");

        write_plugin_dir(&plugins, ".hidden", alpha_toml());
        write_plugin_dir(&plugins, "_draft", alpha_toml());
        write_plugin_dir(&plugins, "node_modules", alpha_toml());

        let report = host.load_all().await.expect("load");
        assert_eq!(report.total, 0);
        assert_eq!(report.errors, 0);
    }

    #[tokio::test]
    async fn load_all_missing_descriptor_counts_error() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        std::fs::create_dir_all(tmp.path().join("plugins/empty")).expect("mkdir");

        let report = host.load_all().await.expect("load");
        assert_eq!(report.total, 0);
        assert_eq!(report.errors, 1);
    }

    #[tokio::test]
    async fn load_all_persisted_source_wins_on_key_collision() {
        let tmp = TempDir::new().expect("tempdir");
        let store = Arc::new(MemoryPluginStore::new());
        let config = PluginHostConfig {
            plugins_dir: tmp.path().join("plugins"),
            uploads_dir: tmp.path().join("uploads"),
        };
        let mut host = PluginHost::new(
            config,
            store.clone(),
            Arc::new(MemoryEventBus::new(100)),
        );

        // Catalog has Alpha@1.0.0 with a distinguishing description
        let descriptor = validate(&raw("Alpha", "/alpha")).expect("valid");
        let mut record = PluginRecord::from_descriptor(&descriptor);
        record.description = "from the catalog".to_string();
        store.upsert(record).await.expect("upsert");

        // Filesystem has the same identity key
        write_plugin_dir(&tmp.path().join("plugins"), "alpha", alpha_toml());

        let report = host.load_all().await.expect("load");
        assert_eq!(report.total, 1);
        assert_eq!(
            host.registry()
                .get("Alpha@1.0.0")
                .map(|e| e.descriptor.description.clone()),
            Some("from the catalog".to_string())
        );
    }

    #[tokio::test]
    async fn load_all_twice_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        write_plugin_dir(&tmp.path().join("plugins"), "alpha", alpha_toml());

        host.load_all().await.expect("first load");
        let first: Vec<PluginDescriptor> = host
            .registry()
            .descriptors()
            .into_iter()
            .cloned()
            .collect();

        host.load_all().await.expect("second load");
        let second: Vec<PluginDescriptor> = host
            .registry()
            .descriptors()
            .into_iter()
            .cloned()
            .collect();

        assert_eq!(first, second);
        assert_eq!(host.registry().len(), 1);
    }

    #[tokio::test]
    async fn filesystem_discovery_is_upserted_into_catalog() {
        let tmp = TempDir::new().expect("tempdir");
        let store = Arc::new(MemoryPluginStore::new());
        let config = PluginHostConfig {
            plugins_dir: tmp.path().join("plugins"),
            uploads_dir: tmp.path().join("uploads"),
        };
        let mut host = PluginHost::new(
            config,
            store.clone(),
            Arc::new(MemoryEventBus::new(100)),
        );
        write_plugin_dir(&tmp.path().join("plugins"), "alpha", alpha_toml());

        host.load_all().await.expect("load");

        let persisted = store.find_one("Alpha").await.expect("find");
        assert!(persisted.is_some_and(|r| r.active));
    }

    #[tokio::test]
    async fn install_then_reload_round_trips() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let installed = host.install(raw("Alpha", "/alpha"), None).await.expect("install");
        assert!(installed.active);
        assert!(installed.installed_at.is_some());
        assert!(host.registry().contains("Alpha@1.0.0"));

        host.load_all().await.expect("reload");
        let entry = host.registry().get("Alpha@1.0.0").expect("present");
        assert!(entry.descriptor.active);
    }

    #[tokio::test]
    async fn install_writes_descriptor_file() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        host.install(raw("My Plugin", "/my-plugin"), None)
            .await
            .expect("install");
        assert!(
            tmp.path()
                .join("plugins/my-plugin")
                .join(DESCRIPTOR_FILE)
                .exists()
        );
    }

    #[tokio::test]
    async fn install_stores_artifact_in_uploads_temp() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        host.install(raw("Alpha", "/alpha"), Some(b"bytes"))
            .await
            .expect("install");

        let temp_dir = tmp.path().join("uploads/temp");
        let entries: Vec<_> = std::fs::read_dir(&temp_dir)
            .expect("read temp")
            .collect::<Result<_, _>>()
            .expect("entries");
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn install_route_conflict_fails_and_leaves_registry_unchanged() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let err = host
            .install(raw("Beta", "/alpha"), None)
            .await
            .expect_err("conflict");
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(err.kind(), "conflict");
        assert_eq!(host.registry().len(), 1);
        assert!(host.registry().by_name("Beta").is_none());
    }

    #[tokio::test]
    async fn install_name_conflict_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        host.install(raw("Alpha", "/alpha"), None).await.expect("install");
        let err = host
            .install(raw("Alpha", "/alpha-two"), None)
            .await
            .expect_err("conflict");
        assert!(matches!(err, LifecycleError::Conflict { existing, .. } if existing == "Alpha@1.0.0"));
    }

    #[tokio::test]
    async fn install_invalid_descriptor_fails_with_issue_list() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let err = host
            .install(RawDescriptor::default(), None)
            .await
            .expect_err("invalid");
        match err {
            LifecycleError::InvalidConfig { issues } => assert_eq!(issues.len(), 5),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn uninstall_unknown_name_is_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let err = host.uninstall("Ghost").await.expect_err("missing");
        assert!(matches!(err, LifecycleError::NotFound { .. }));
        assert!(host.registry().is_empty());
    }

    #[tokio::test]
    async fn uninstall_removes_registry_cache_and_routes() {
        let tmp = TempDir::new().expect("tempdir");
        let store = Arc::new(MemoryPluginStore::new());
        let config = PluginHostConfig {
            plugins_dir: tmp.path().join("plugins"),
            uploads_dir: tmp.path().join("uploads"),
        };
        let mut host = PluginHost::new(
            config,
            store.clone(),
            Arc::new(MemoryEventBus::new(100)),
        );
        host.register_handler("Alpha", Arc::new(EchoHandler));

        host.install(raw("Alpha", "/alpha"), None).await.expect("install");
        assert!(host.routes().match_route(HttpMethod::Get, "/alpha").is_some());

        host.uninstall("Alpha").await.expect("uninstall");

        assert!(!host.registry().contains("Alpha@1.0.0"));
        assert!(host.cache().get("Alpha@1.0.0").is_none());
        assert!(host.routes().match_route(HttpMethod::Get, "/alpha").is_none());

        let record = store.find_one("Alpha").await.expect("find").expect("some");
        assert!(!record.active);
    }

    #[tokio::test]
    async fn update_merges_fields_and_refreshes_registry() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let patch = PluginPatch {
            description: Some("better description".to_string()),
            featured: Some(true),
            ..Default::default()
        };
        let updated = host.update("Alpha", patch).await.expect("update");

        assert_eq!(updated.description, "better description");
        assert!(updated.featured);
        assert!(updated.last_updated.is_some());

        let entry = host.registry().by_name("Alpha").expect("entry");
        assert_eq!(entry.descriptor.description, "better description");
    }

    #[tokio::test]
    async fn update_unknown_name_is_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let err = host
            .update("Ghost", PluginPatch::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, LifecycleError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_route_moves_dispatch_entries() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.register_handler("Alpha", Arc::new(EchoHandler));
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let patch = PluginPatch {
            route: Some("/alpha-v2".to_string()),
            ..Default::default()
        };
        host.update("Alpha", patch).await.expect("update");

        assert!(host.routes().match_route(HttpMethod::Get, "/alpha").is_none());
        assert!(
            host.routes()
                .match_route(HttpMethod::Get, "/alpha-v2")
                .is_some()
        );
    }

    #[tokio::test]
    async fn update_rejects_malformed_route() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let patch = PluginPatch {
            route: Some("Not A Route".to_string()),
            ..Default::default()
        };
        let err = host.update("Alpha", patch).await.expect_err("invalid");
        assert_eq!(err.kind(), "invalid_config");
    }

    #[tokio::test]
    async fn update_deactivation_withdraws_routes() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.register_handler("Alpha", Arc::new(EchoHandler));
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let patch = PluginPatch {
            active: Some(false),
            ..Default::default()
        };
        host.update("Alpha", patch).await.expect("update");

        assert!(host.routes().match_route(HttpMethod::Get, "/alpha").is_none());
    }

    #[tokio::test]
    async fn backup_writes_snapshot() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");
        host.install(raw("Beta", "/beta"), None).await.expect("install");

        let report = host.backup().expect("backup");
        assert_eq!(report.count, 2);
        assert!(report.path.exists());

        let body = std::fs::read_to_string(&report.path).expect("read");
        assert!(body.contains("Alpha"));
        assert!(body.contains("Beta"));
    }

    #[tokio::test]
    async fn dispatch_route_serves_and_counts() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.register_handler("Alpha", Arc::new(EchoHandler));
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let response = host
            .dispatch_route(HttpMethod::Get, "/alpha", RouteRequest::default())
            .expect("dispatch");
        assert_eq!(response.status, 200);

        let response = host
            .dispatch_route(HttpMethod::Get, "/alpha/echo/hello", RouteRequest::default())
            .expect("dispatch");
        assert_eq!(String::from_utf8_lossy(&response.body), "hello");

        let entry = host.cache().get("Alpha@1.0.0").expect("cache entry");
        assert_eq!(entry.request_count, 2);
        assert_eq!(entry.error_count, 0);
        assert!(entry.last_used.is_some());
    }

    #[tokio::test]
    async fn dispatch_route_records_handler_errors() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        host.register_handler("Alpha", Arc::new(EchoHandler));
        host.install(raw("Alpha", "/alpha"), None).await.expect("install");

        let mut request = RouteRequest::default();
        request.query.insert("fail".to_string(), "1".to_string());
        let err = host
            .dispatch_route(HttpMethod::Get, "/alpha", request)
            .expect_err("handler error");
        assert!(matches!(err, PluginHostError::Handler(_)));

        let entry = host.cache().get("Alpha@1.0.0").expect("cache entry");
        assert_eq!(entry.error_count, 1);
    }

    #[tokio::test]
    async fn dispatch_route_unknown_path_is_route_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);

        let err = host
            .dispatch_route(HttpMethod::Get, "/nowhere", RouteRequest::default())
            .expect_err("no route");
        assert!(matches!(err, PluginHostError::RouteNotFound { .. }));
    }

    #[tokio::test]
    async fn view_content_requires_view_flag() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        let plugins = tmp.path().join("plugins");
        write_plugin_dir(&plugins, "alpha", alpha_toml());
        std::fs::write(plugins.join("alpha").join(VIEW_FILE), "<h1>Alpha</h1>").expect("write");

        host.load_all().await.expect("load");

        let entry = host.registry().by_name("Alpha").expect("entry");
        assert!(entry.descriptor.has_view);
        assert_eq!(host.view_content("Alpha").expect("view"), "<h1>Alpha</h1>");

        let err = host.view_content("Ghost").expect_err("missing");
        assert!(matches!(err, PluginHostError::NotFound { .. }));
    }

    #[tokio::test]
    async fn directory_config_merges_into_descriptor() {
        let tmp = TempDir::new().expect("tempdir");
        let mut host = host_with_dirs(&tmp);
        let plugins = tmp.path().join("plugins");
        write_plugin_dir(&plugins, "alpha", alpha_toml());
        std::fs::write(
            plugins.join("alpha").join(CONFIG_FILE),
            "greeting = \"hello\"",
        )
        .expect("write");

        host.load_all().await.expect("load");

        let entry = host.registry().by_name("Alpha").expect("entry");
        assert_eq!(
            entry.descriptor.config.get("greeting").and_then(|v| v.as_str()),
            Some("hello")
        );
    }

    #[test]
    fn load_guard_rejects_second_acquire() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = LoadGuard::acquire(&flag).expect("first");
        assert!(matches!(
            LoadGuard::acquire(&flag),
            Err(PluginHostError::LoadInProgress)
        ));
        drop(guard);
        assert!(LoadGuard::acquire(&flag).is_ok());
    }
}
