//! Dynamic store layer.
//!
//! Wraps a [`KvStore`] as the highest-priority layer. The layer is a
//! materialized snapshot refreshed on demand; single-key reads can bypass it.

use std::sync::Arc;
use std::time::Duration;

use layerconf_kv::KvStore;
use tracing::debug;

use super::error::ConfigError;
use super::layer::{Layer, LayerKind};

/// Adapter between the resolver and an external key-value store.
#[derive(Clone)]
pub struct DynamicStoreAdapter {
    store: Arc<dyn KvStore>,
    label: String,
}

impl std::fmt::Debug for DynamicStoreAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicStoreAdapter")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl DynamicStoreAdapter {
    pub fn new(store: Arc<dyn KvStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    /// Provenance label of the materialized layer.
    pub fn source(&self) -> String {
        format!("Dynamic store '{}'", self.label)
    }

    /// Bulk-read the store into a fresh layer.
    pub fn materialize(&self) -> Result<Layer, ConfigError> {
        let entries = self.store.read_all()?;
        debug!(source = %self.source(), keys = entries.len(), "materialized dynamic layer");
        Ok(Layer::from_scalars(self.source(), LayerKind::Dynamic, entries))
    }

    /// Write one key with an expiration. A zero TTL never expires.
    pub fn write(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ConfigError> {
        self.store.write(key, value, ttl)?;
        Ok(())
    }

    /// Read one key straight from the store, ignoring any snapshot.
    pub fn read_direct(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.store.read_one(key)?)
    }
}
