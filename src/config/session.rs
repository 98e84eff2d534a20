//! Configuration session.
//!
//! A [`Configuration`] owns the layer stack, the active parameter set and
//! the dynamic store adapter for one logical session. It is built once by
//! [`ConfigurationBuilder::build`] and then shared by reference: reads take
//! `&self`, writes to the dynamic store take `&mut self`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use layerconf_kv::KvStore;
use regex_lite::Regex;
use tracing::{info_span, warn};
use ulid::Ulid;

use super::defaults::{
    audit_keys, governing_keys, ACTIVE_PARAMETER_SET, DEFAULT_LOADED_FILES, DEFAULT_TTL,
    IGNORED_WARNING_KEYS, LIST_SEPARATOR, LOADED_FILES,
};
use super::dynamic::DynamicStoreAdapter;
use super::error::ConfigError;
use super::layer::{LayerInfo, LayerStack};
use super::loader::{FileLoader, LoadReport, ResourceLoader, StandardLoader};
use super::parameter_set::ParameterSets;
use super::registry::{KeyDef, KeyRegistry};
use super::resolver::{resolve, ResolvedKey};
use super::value::Value;

/// Builder for a [`Configuration`].
pub struct ConfigurationBuilder {
    loader: Box<dyn ResourceLoader>,
    store: Option<(Arc<dyn KvStore>, String)>,
    locators: Vec<String>,
    with_predefined: bool,
    default_loaded_files: String,
    definitions: Vec<(String, KeyDef)>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self {
            loader: Box::new(StandardLoader::new()),
            store: None,
            locators: Vec::new(),
            with_predefined: true,
            default_loaded_files: DEFAULT_LOADED_FILES.to_string(),
            definitions: Vec::new(),
        }
    }
}

impl ConfigurationBuilder {
    /// Fetch locators through `loader` (default: [`StandardLoader`]).
    pub fn loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Attach a dynamic store as the highest-priority layer.
    pub fn store(mut self, store: Arc<dyn KvStore>, label: impl Into<String>) -> Self {
        self.store = Some((store, label.into()));
        self
    }

    /// Additional `;`-separated locators loaded after the predefined list.
    pub fn locator(mut self, locators: impl AsRef<str>) -> Self {
        self.locators.extend(
            locators
                .as_ref()
                .split(LIST_SEPARATOR)
                .map(str::to_string),
        );
        self
    }

    /// Whether to seed the worklist from `config.loaded_files` (default: true).
    pub fn with_predefined_configuration(mut self, enabled: bool) -> Self {
        self.with_predefined = enabled;
        self
    }

    /// Built-in default of `config.loaded_files`.
    pub fn default_loaded_files(mut self, locators: impl Into<String>) -> Self {
        self.default_loaded_files = locators.into();
        self
    }

    /// Register key definitions before any file is loaded.
    pub fn register<I, K>(mut self, defs: I) -> Self
    where
        I: IntoIterator<Item = (K, KeyDef)>,
        K: Into<String>,
    {
        self.definitions
            .extend(defs.into_iter().map(|(k, def)| (k.into(), def)));
        self
    }

    /// Build the session: register keys, materialize the dynamic store, load
    /// file layers and resolve the active parameter set.
    ///
    /// Fails on duplicate key definitions or an unreadable dynamic store.
    /// Unloadable files are skipped.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        let session_id = Ulid::new();
        let span = info_span!("config.init", session_id = %session_id);
        let _enter = span.enter();

        let mut registry = KeyRegistry::new();
        registry.register(governing_keys(&self.default_loaded_files), false)?;
        registry.register(self.definitions, false)?;
        let mut stack = LayerStack::new(registry);

        let dynamic = match self.store {
            Some((store, label)) => {
                let adapter = DynamicStoreAdapter::new(store, label);
                stack.set_dynamic(adapter.materialize()?);
                Some(adapter)
            }
            None => None,
        };

        let mut worklist = Vec::new();
        if self.with_predefined {
            if let Some(list) = resolve(&stack, None, LOADED_FILES).value {
                worklist.extend(list.split(LIST_SEPARATOR).map(str::to_string));
            }
        }
        worklist.extend(self.locators);
        let load_report = FileLoader::new(self.loader.as_ref()).load(&mut stack, worklist);

        let mut parameter_sets = ParameterSets::default();
        parameter_sets.refresh_active(&stack);

        stack.registry_mut().register(audit_keys(), false)?;

        let mut config = Configuration {
            session_id,
            stack,
            parameter_sets,
            dynamic,
            load_report,
            ignored_warning_patterns: Vec::new(),
        };
        config.ignored_warning_patterns = config.compile_ignored_warning_patterns()?;
        Ok(config)
    }
}

/// Resolved configuration for one session.
#[derive(Debug)]
pub struct Configuration {
    session_id: Ulid,
    pub(crate) stack: LayerStack,
    parameter_sets: ParameterSets,
    dynamic: Option<DynamicStoreAdapter>,
    load_report: LoadReport,
    pub(crate) ignored_warning_patterns: Vec<Regex>,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn session_id(&self) -> Ulid {
        self.session_id
    }

    pub fn registry(&self) -> &KeyRegistry {
        self.stack.registry()
    }

    /// Register further key definitions on the built-in layer.
    pub fn register<I, K>(&mut self, defs: I, allow_overwrite: bool) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, KeyDef)>,
        K: AsRef<str>,
    {
        self.stack.registry_mut().register(defs, allow_overwrite)
    }

    pub fn active_parameter_set(&self) -> Option<&str> {
        self.parameter_sets.active()
    }

    /// Check that the active parameter set exists on some layer.
    pub fn parameter_set_sanity_check(&self) -> Result<(), ConfigError> {
        self.parameter_sets.sanity_check(&self.stack)
    }

    /// Resolve a key with full provenance.
    pub fn get_extended(&self, key: &str) -> ResolvedKey {
        resolve(&self.stack, self.parameter_sets.active(), key)
    }

    /// Every layer in load order.
    pub fn loaded_layers(&self) -> Vec<LayerInfo> {
        self.stack.in_load_order().map(|layer| layer.info()).collect()
    }

    /// What the file loader did during initialization.
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    fn adapter(&self) -> Result<&DynamicStoreAdapter, ConfigError> {
        self.dynamic.as_ref().ok_or(ConfigError::NoDynamicStore)
    }

    /// Write one key to the dynamic store.
    ///
    /// Without a TTL, `config.default_ttl` applies. The value is also written
    /// into this session's dynamic layer, so the next resolution sees it.
    /// Writing `config.active_parameter_set` switches the active set.
    pub fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), ConfigError> {
        let ttl = match ttl {
            Some(ttl) => ttl,
            None => self.get_duration(DEFAULT_TTL)?,
        };
        self.adapter()?.write(key, value, ttl)?;

        if let Some(layer) = self.stack.dynamic_mut() {
            layer
                .entries
                .insert(key.to_string(), Value::Scalar(value.to_string()));
        }
        if key == ACTIVE_PARAMETER_SET {
            self.parameter_sets.set_active(value, &self.stack);
        }
        Ok(())
    }

    /// Write several keys; each write is independent.
    pub fn import(&mut self, entries: BTreeMap<String, String>) -> Result<(), ConfigError> {
        for (key, value) in entries {
            self.set(&key, &value, None)?;
        }
        Ok(())
    }

    /// Re-materialize the dynamic layer from the store.
    pub fn reread(&mut self) -> Result<(), ConfigError> {
        let layer = self.adapter()?.materialize()?;
        self.stack.set_dynamic(layer);
        Ok(())
    }

    /// Read one key straight from the dynamic store, ignoring the snapshot.
    pub fn read_direct(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.adapter()?.read_direct(key)
    }

    fn compile_ignored_warning_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        let records = self.get_list_of_records(IGNORED_WARNING_KEYS)?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Regex::new(&format!("^(?:{})", record.name)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %record.name, "Invalid '{}' pattern: {}", IGNORED_WARNING_KEYS, e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::MemoryLoader;
    use layerconf_kv::MemoryStore;

    fn builder() -> ConfigurationBuilder {
        Configuration::builder().with_predefined_configuration(false)
    }

    #[test]
    fn test_build_without_layers() {
        let config = builder().build().unwrap();

        let layers = config.loaded_layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(config.active_parameter_set(), None);
        assert!(config.registry().contains(IGNORED_WARNING_KEYS));
    }

    #[test]
    fn test_duplicate_definition_is_fatal() {
        let result = builder()
            .register([(LOADED_FILES.to_string(), KeyDef::from("x"))])
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateKey(_))));
    }

    #[test]
    fn test_predefined_list_seeds_worklist() {
        let loader = MemoryLoader::new().with("internal:custom.config.yaml", "svc.name: custom\n");
        let config = Configuration::builder()
            .loader(loader)
            .register([("svc.name".to_string(), KeyDef::from("default"))])
            .build()
            .unwrap();

        assert_eq!(config.get("svc.name").unwrap(), "custom");
        assert_eq!(config.load_report().skipped.len(), 1);
    }

    #[test]
    fn test_dynamic_store_can_redirect_loaded_files() {
        let store = Arc::new(MemoryStore::from_entries([(LOADED_FILES, "remote.yaml")]));
        let loader = MemoryLoader::new().with("remote.yaml", "k: v\n");
        let config = Configuration::builder()
            .loader(loader)
            .store(store, "kv")
            .build()
            .unwrap();

        assert_eq!(config.load_report().loaded, vec!["remote.yaml"]);
    }

    #[test]
    fn test_set_without_store_fails() {
        let mut config = builder().build().unwrap();
        assert!(matches!(
            config.set("k", "v", None),
            Err(ConfigError::NoDynamicStore)
        ));
    }

    #[test]
    fn test_set_is_visible_immediately() {
        let store = Arc::new(MemoryStore::new());
        let mut config = builder()
            .store(store.clone(), "kv")
            .register([("svc.timeout".to_string(), KeyDef::from(30_i64))])
            .build()
            .unwrap();

        config.set("svc.timeout", "90", None).unwrap();

        assert_eq!(config.get_int("svc.timeout").unwrap(), 90);
        assert_eq!(config.get_extended("svc.timeout").origin, "Dynamic store 'kv'");
        assert_eq!(store.read_one("svc.timeout").unwrap(), Some("90".to_string()));
    }

    #[test]
    fn test_reread_picks_up_external_writes() {
        let store = Arc::new(MemoryStore::new());
        let mut config = builder()
            .store(store.clone(), "kv")
            .register([("svc.timeout".to_string(), KeyDef::from(30_i64))])
            .build()
            .unwrap();

        store.write("svc.timeout", "15", Duration::ZERO).unwrap();
        assert_eq!(config.get_int("svc.timeout").unwrap(), 30);
        assert_eq!(config.read_direct("svc.timeout").unwrap(), Some("15".to_string()));

        config.reread().unwrap();
        assert_eq!(config.get_int("svc.timeout").unwrap(), 15);
    }

    #[test]
    fn test_writing_active_set_switches_groups() {
        let loader = MemoryLoader::new().with(
            "a.yaml",
            "svc.timeout: 45\nfast:\n  svc.timeout: 5\n",
        );
        let mut config = builder()
            .loader(loader)
            .locator("a.yaml")
            .store(Arc::new(MemoryStore::new()), "kv")
            .register([("svc.timeout".to_string(), KeyDef::from(30_i64))])
            .build()
            .unwrap();
        assert_eq!(config.get_int("svc.timeout").unwrap(), 45);

        config.set(ACTIVE_PARAMETER_SET, "fast", None).unwrap();
        assert_eq!(config.active_parameter_set(), Some("fast"));
        assert_eq!(config.get_int("svc.timeout").unwrap(), 5);

        config.set(ACTIVE_PARAMETER_SET, "", None).unwrap();
        assert_eq!(config.active_parameter_set(), None);
        assert_eq!(config.get_int("svc.timeout").unwrap(), 45);
    }

    #[test]
    fn test_writing_missing_active_set_is_not_fatal() {
        let mut config = builder()
            .store(Arc::new(MemoryStore::new()), "kv")
            .register([("svc.timeout".to_string(), KeyDef::from(30_i64))])
            .build()
            .unwrap();

        config.set(ACTIVE_PARAMETER_SET, "ghost", None).unwrap();
        assert_eq!(config.active_parameter_set(), Some("ghost"));
        assert!(matches!(
            config.parameter_set_sanity_check(),
            Err(ConfigError::MisconfiguredParameterSet(ref n)) if n == "ghost"
        ));
        assert_eq!(config.get_int("svc.timeout").unwrap(), 30);
    }

    #[test]
    fn test_import_writes_every_key() {
        let store = Arc::new(MemoryStore::new());
        let mut config = builder().store(store.clone(), "kv").build().unwrap();

        config
            .import(BTreeMap::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]))
            .unwrap();

        assert_eq!(store.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_late_registration() {
        let mut config = builder().build().unwrap();
        config.register([("late.key", KeyDef::from("x"))], false).unwrap();
        assert_eq!(config.get("late.key").unwrap(), "x");
        assert!(config.register([("late.key", KeyDef::from("y"))], false).is_err());
    }
}
