//! File layer loading.
//!
//! Locators are fetched through a [`ResourceLoader`], deserialized according
//! to their extension, and appended to the layer stack in order. A loaded
//! document may itself declare `config.loaded_files`; those locators are
//! appended to the end of the worklist, so the hierarchy expands breadth
//! first. Loading is best-effort: a locator that cannot be fetched or parsed
//! is logged and skipped.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value as Json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::defaults::{
    DEFAULT_MAX_FILE_HIERARCHY_DEPTH, LIST_SEPARATOR, LOADED_FILES, MAX_FILE_HIERARCHY_DEPTH,
};
use super::error::ConfigError;
use super::layer::{Layer, LayerKind, LayerStack};
use super::resolver::resolve;
use super::value::Value;

/// Prefix for resources embedded in the loader rather than read from disk.
pub const INTERNAL_SCHEME: &str = "internal:";

const FILE_SCHEME: &str = "file://";

/// Fetches the raw bytes behind a locator.
pub trait ResourceLoader: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, ConfigError>;
}

/// Loader for `internal:` resources, `file://` URLs and plain paths.
#[derive(Debug, Clone, Default)]
pub struct StandardLoader {
    internal: BTreeMap<String, Vec<u8>>,
    base_dir: Option<PathBuf>,
}

impl StandardLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Embed a resource reachable as `internal:<name>`.
    pub fn with_internal(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.internal.insert(name.into(), contents.into());
        self
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ResourceLoader for StandardLoader {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, ConfigError> {
        if let Some(name) = locator.strip_prefix(INTERNAL_SCHEME) {
            return self
                .internal
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::ResourceLoad {
                    locator: locator.to_string(),
                    reason: "no such internal resource".to_string(),
                });
        }
        let path = locator.strip_prefix(FILE_SCHEME).unwrap_or(locator);
        fs::read(self.resolve_path(path)).map_err(|e| ConfigError::ResourceLoad {
            locator: locator.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fixed map of locator to document text.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: BTreeMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, contents: impl Into<String>) -> Self {
        self.resources.insert(locator.into(), contents.into());
        self
    }
}

impl ResourceLoader for MemoryLoader {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, ConfigError> {
        self.resources
            .get(locator)
            .map(|s| s.clone().into_bytes())
            .ok_or_else(|| ConfigError::ResourceLoad {
                locator: locator.to_string(),
                reason: "not found".to_string(),
            })
    }
}

/// Document syntax, chosen from the locator's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_locator(locator: &str) -> Self {
        let lower = locator.to_ascii_lowercase();
        if lower.ends_with(".toml") {
            DocumentFormat::Toml
        } else if lower.ends_with(".json") {
            DocumentFormat::Json
        } else {
            DocumentFormat::Yaml
        }
    }
}

/// Parse raw bytes into a file layer, recording their digest.
pub fn parse_document(locator: &str, bytes: &[u8]) -> Result<Layer, ConfigError> {
    let parse_error = |reason: String| ConfigError::Parse {
        locator: locator.to_string(),
        reason,
    };

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());

    let contents =
        std::str::from_utf8(bytes).map_err(|e| parse_error(format!("Invalid UTF-8: {}", e)))?;

    let tree: Json = match DocumentFormat::from_locator(locator) {
        DocumentFormat::Toml => {
            let value: toml::Value = toml::from_str(contents)
                .map_err(|e| parse_error(format!("TOML parse error: {}", e)))?;
            Value::toml_to_json(value)
        }
        DocumentFormat::Json => serde_json::from_str(contents)
            .map_err(|e| parse_error(format!("JSON parse error: {}", e)))?,
        DocumentFormat::Yaml => serde_yaml::from_str(contents)
            .map_err(|e| parse_error(format!("YAML parse error: {}", e)))?,
    };

    if tree.is_null() {
        return Err(parse_error("empty document".to_string()));
    }
    Layer::from_tree(locator, LayerKind::File, tree)
        .map(|layer| layer.with_digest(digest))
        .ok_or_else(|| parse_error("document root is not a mapping".to_string()))
}

/// Outcome of a load pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LoadReport {
    /// Locators appended as layers, in load order
    pub loaded: Vec<String>,

    /// Locators skipped with the reason
    pub skipped: Vec<(String, String)>,

    /// True when the depth guard stopped processing
    pub truncated: bool,
}

/// Expands a worklist of locators into file layers.
pub struct FileLoader<'a> {
    loader: &'a dyn ResourceLoader,
}

impl<'a> FileLoader<'a> {
    pub fn new(loader: &'a dyn ResourceLoader) -> Self {
        Self { loader }
    }

    /// Drain the worklist seeded with `seed`, appending layers to `stack`.
    ///
    /// The depth guard compares the position of the current entry in the
    /// worklist against `config.max_file_hierarchy_depth`, re-read after each
    /// loaded document. It bounds the number of entries processed, not the
    /// nesting depth of inclusion.
    pub fn load(&self, stack: &mut LayerStack, seed: Vec<String>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut worklist: VecDeque<String> = seed.into();
        let mut index: usize = 0;

        while let Some(locator) = worklist.pop_front() {
            let position = index;
            index += 1;

            let locator = locator.trim();
            if locator.is_empty() {
                continue;
            }

            let layer = match self
                .loader
                .fetch(locator)
                .and_then(|bytes| parse_document(locator, &bytes))
            {
                Ok(layer) => layer,
                Err(e) => {
                    warn!("{} (Notice: It will be safely ignored!)", e);
                    report.skipped.push((locator.to_string(), e.to_string()));
                    continue;
                }
            };

            match layer.entries.get(LOADED_FILES) {
                Some(Value::Scalar(list)) => {
                    worklist.extend(list.split(LIST_SEPARATOR).map(str::to_string));
                }
                Some(_) => warn!(
                    locator,
                    "'{}' must be a '{}'-separated string; ignoring it",
                    LOADED_FILES,
                    LIST_SEPARATOR
                ),
                None => {}
            }

            debug!(
                locator,
                digest = layer.digest.as_deref().unwrap_or(""),
                keys = layer.entries.len(),
                "loaded configuration layer"
            );
            stack.push_file(layer);
            report.loaded.push(locator.to_string());

            if position as i64 > max_depth(stack) {
                warn!(
                    "Too many configuration file loads ({:?})! Stopping here!",
                    report.loaded
                );
                report.truncated = true;
                break;
            }
        }
        report
    }
}

fn max_depth(stack: &LayerStack) -> i64 {
    let resolved = resolve(stack, None, MAX_FILE_HIERARCHY_DEPTH);
    match resolved.value.as_deref().map(|v| v.trim().parse::<i64>()) {
        Some(Ok(depth)) => depth,
        Some(Err(_)) => {
            warn!(
                origin = %resolved.origin,
                "'{}' is not an integer; using {}",
                MAX_FILE_HIERARCHY_DEPTH,
                DEFAULT_MAX_FILE_HIERARCHY_DEPTH
            );
            DEFAULT_MAX_FILE_HIERARCHY_DEPTH
        }
        None => DEFAULT_MAX_FILE_HIERARCHY_DEPTH,
    }
}
