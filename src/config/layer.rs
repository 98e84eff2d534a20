//! Configuration layers and their precedence.
//!
//! Precedence, lowest to highest:
//! 1. Built-in defaults (the key registry)
//! 2. Loaded files, in load order
//! 3. The dynamic store
//!
//! Layers are appended during initialization and never reordered.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;

use super::registry::{KeyMeta, KeyRegistry};
use super::value::Value;

/// Provenance label of the built-in layer.
pub const BUILTIN_SOURCE: &str = "Built-in defaults";

/// Kind of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Builtin,
    File,
    Dynamic,
}

/// A file or dynamic-store layer.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Provenance label (locator for files)
    pub source: String,

    pub kind: LayerKind,

    /// SHA-256 digest of the raw document (files only)
    pub digest: Option<String>,

    pub entries: BTreeMap<String, Value>,
}

impl Layer {
    /// Build a layer from a deserialized document. Returns None if the root
    /// is not a mapping.
    pub fn from_tree(source: impl Into<String>, kind: LayerKind, tree: Json) -> Option<Self> {
        match tree {
            Json::Object(map) => Some(Self {
                source: source.into(),
                kind,
                digest: None,
                entries: map
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            }),
            _ => None,
        }
    }

    /// Build a layer of flat string entries, as read from the dynamic store.
    pub fn from_scalars(source: impl Into<String>, kind: LayerKind, map: BTreeMap<String, String>) -> Self {
        Self {
            source: source.into(),
            kind,
            digest: None,
            entries: map.into_iter().map(|(k, v)| (k, Value::Scalar(v))).collect(),
        }
    }

    pub fn with_digest(mut self, digest: String) -> Self {
        self.digest = Some(digest);
        self
    }
}

/// Summary of a layer for reporting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayerInfo {
    pub kind: LayerKind,
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    pub keys: usize,
}

/// Borrowed view over any layer, built-in included.
#[derive(Debug, Clone, Copy)]
pub enum LayerRef<'a> {
    Builtin(&'a KeyRegistry),
    Loaded(&'a Layer),
}

impl<'a> LayerRef<'a> {
    pub fn source(&self) -> &'a str {
        match self {
            LayerRef::Builtin(_) => BUILTIN_SOURCE,
            LayerRef::Loaded(layer) => &layer.source,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LayerRef::Builtin(_))
    }

    /// Entry as stored on a non-built-in layer.
    pub fn entry(&self, key: &str) -> Option<&'a Value> {
        match self {
            LayerRef::Builtin(_) => None,
            LayerRef::Loaded(layer) => layer.entries.get(key),
        }
    }

    /// Definition as stored on the built-in layer.
    pub fn meta(&self, key: &str) -> Option<&'a KeyMeta> {
        match self {
            LayerRef::Builtin(registry) => registry.get(key),
            LayerRef::Loaded(_) => None,
        }
    }

    /// The parameter-set group called `name`, if this layer has one.
    pub fn group(&self, name: &str) -> Option<&'a BTreeMap<String, Value>> {
        self.entry(name).and_then(Value::as_group)
    }

    /// Names of every entry on the layer, in layer order.
    pub fn key_names(&self) -> Vec<&'a str> {
        match self {
            LayerRef::Builtin(registry) => registry.keys().collect(),
            LayerRef::Loaded(layer) => layer.entries.keys().map(String::as_str).collect(),
        }
    }

    pub fn info(&self) -> LayerInfo {
        match self {
            LayerRef::Builtin(registry) => LayerInfo {
                kind: LayerKind::Builtin,
                source: BUILTIN_SOURCE.to_string(),
                digest: None,
                keys: registry.len(),
            },
            LayerRef::Loaded(layer) => LayerInfo {
                kind: layer.kind,
                source: layer.source.clone(),
                digest: layer.digest.clone(),
                keys: layer.entries.len(),
            },
        }
    }
}

/// The ordered stack of layers.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    registry: KeyRegistry,
    files: Vec<Layer>,
    dynamic: Option<Layer>,
}

impl LayerStack {
    pub fn new(registry: KeyRegistry) -> Self {
        Self {
            registry,
            files: Vec::new(),
            dynamic: None,
        }
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut KeyRegistry {
        &mut self.registry
    }

    /// Append a file layer above every previously loaded file.
    pub fn push_file(&mut self, layer: Layer) {
        self.files.push(layer);
    }

    pub fn files(&self) -> &[Layer] {
        &self.files
    }

    /// Replace the dynamic layer with a fresh materialization.
    pub fn set_dynamic(&mut self, layer: Layer) {
        self.dynamic = Some(layer);
    }

    pub fn dynamic(&self) -> Option<&Layer> {
        self.dynamic.as_ref()
    }

    pub fn dynamic_mut(&mut self) -> Option<&mut Layer> {
        self.dynamic.as_mut()
    }

    /// Layers from highest to lowest priority: dynamic, newest file first,
    /// built-in last.
    pub fn by_priority(&self) -> impl Iterator<Item = LayerRef<'_>> {
        self.dynamic
            .iter()
            .map(LayerRef::Loaded)
            .chain(self.files.iter().rev().map(LayerRef::Loaded))
            .chain(std::iter::once(LayerRef::Builtin(&self.registry)))
    }

    /// Layers in load order: built-in, files, dynamic.
    pub fn in_load_order(&self) -> impl Iterator<Item = LayerRef<'_>> {
        std::iter::once(LayerRef::Builtin(&self.registry))
            .chain(self.files.iter().map(LayerRef::Loaded))
            .chain(self.dynamic.iter().map(LayerRef::Loaded))
    }
}
