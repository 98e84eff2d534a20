//! Key resolution across layers.
//!
//! Layers are walked from highest to lowest priority. Within one layer the
//! active parameter set is consulted before the flat value; the first layer
//! yielding a value wins.

use serde::Serialize;

use super::layer::{LayerRef, LayerStack};
use super::registry::KeyMeta;
use super::value::Value;

const WARNING_TAG: &str = "[WARNING]";

/// Outcome of resolving one key. Recomputed on every access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedKey {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Value")]
    pub value: Option<String>,

    #[serde(rename = "Success")]
    pub success: bool,

    #[serde(rename = "ConfigurationOrigin")]
    pub origin: String,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "Stable")]
    pub stable: bool,

    /// Parameter set the value was taken from
    #[serde(rename = "ParameterSet", skip_serializing_if = "Option::is_none")]
    pub parameter_set: Option<String>,

    /// Built-in definition, when the key is known
    #[serde(flatten)]
    pub meta: Option<KeyMeta>,
}

impl ResolvedKey {
    /// True when the status carries a warning (unknown or misconfigured key).
    pub fn is_warning(&self) -> bool {
        self.status.starts_with(WARNING_TAG)
    }
}

/// A resolved key as reported by dumps: bookkeeping fields stripped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyReport {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Value")]
    pub value: Option<String>,

    #[serde(rename = "ConfigurationOrigin")]
    pub origin: String,

    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "Stable")]
    pub stable: bool,

    #[serde(rename = "ParameterSet", skip_serializing_if = "Option::is_none")]
    pub parameter_set: Option<String>,

    #[serde(flatten)]
    pub meta: Option<KeyMeta>,
}

impl From<ResolvedKey> for KeyReport {
    fn from(r: ResolvedKey) -> Self {
        Self {
            key: r.key,
            value: r.value,
            origin: r.origin,
            status: r.status,
            stable: r.stable,
            parameter_set: r.parameter_set,
            meta: r.meta,
        }
    }
}

/// Resolve `key` against `stack` with `active_set` as the active parameter set.
pub fn resolve(stack: &LayerStack, active_set: Option<&str>, key: &str) -> ResolvedKey {
    let registry = stack.registry();
    let key_def = registry.get(key);
    let stable = registry.is_stable(key);

    for layer in stack.by_priority() {
        if let Some(set) = active_set {
            let grouped = layer
                .group(set)
                .and_then(|group| group.get(key))
                .and_then(Value::as_scalar);
            if let Some(value) = grouped {
                return found(key, key_def, stable, &layer, value, Some(set));
            }
        }
        if let Some(value) = flat_value(&layer, key) {
            return found(key, key_def, stable, &layer, value, None);
        }
    }

    let status = match key_def {
        Some(_) => format!(
            "{} Configuration key '{}' is registered but no layer provides a value",
            WARNING_TAG, key
        ),
        None => format!("{} Unknown configuration key '{}'", WARNING_TAG, key),
    };
    ResolvedKey {
        key: key.to_string(),
        value: None,
        success: false,
        origin: "None".to_string(),
        status,
        stable,
        parameter_set: None,
        meta: key_def.cloned(),
    }
}

/// Flat value of `key` on one layer. On the built-in layer this is always
/// the registered default; sequences and groups never resolve.
fn flat_value<'a>(layer: &LayerRef<'a>, key: &str) -> Option<&'a str> {
    match layer {
        LayerRef::Builtin(_) => layer.meta(key).map(|m| m.default_value.as_str()),
        LayerRef::Loaded(_) => layer.entry(key).and_then(Value::as_scalar),
    }
}

fn found(
    key: &str,
    key_def: Option<&KeyMeta>,
    stable: bool,
    layer: &LayerRef<'_>,
    value: &str,
    parameter_set: Option<&str>,
) -> ResolvedKey {
    let source = layer.source();
    let mut status = match parameter_set {
        Some(set) => format!("Key found in '{}' (ParameterSet='{}')", source, set),
        None => format!("Key found in '{}'", source),
    };
    if key_def.is_none() {
        status = format!(
            "{} Key '{}' doesn't exist as built-in default (Misconfiguration??) but {}!",
            WARNING_TAG, key, status
        );
    }
    ResolvedKey {
        key: key.to_string(),
        value: Some(value.to_string()),
        success: true,
        origin: source.to_string(),
        status,
        stable,
        parameter_set: parameter_set.map(str::to_string),
        meta: key_def.cloned(),
    }
}
