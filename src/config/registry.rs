//! Built-in key definitions.
//!
//! The registry is the built-in layer: every known key has exactly one
//! [`KeyMeta`] here, registered through a composite `name[,Flag...]` string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::error::ConfigError;
use crate::parse::Record;

/// Flag marking a key whose semantics are frozen.
pub const STABLE_FLAG: &str = "Stable";

/// Declared format of a key's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Bool,
    String,
    StringList,
    MetaStringList,
    Integer,
    PositiveInteger,
    Float,
    Duration,
    Date,
}

impl Format {
    /// Best guess for a shorthand default given as a bare scalar.
    fn infer(default: &Json) -> Self {
        match default {
            Json::Bool(_) => Format::Bool,
            Json::Number(n) if n.is_i64() || n.is_u64() => Format::Integer,
            Json::Number(_) => Format::Float,
            _ => Format::String,
        }
    }
}

/// Definition of a known key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMeta {
    #[serde(rename = "DefaultValue")]
    pub default_value: String,

    #[serde(rename = "Format")]
    pub format: Format,

    #[serde(rename = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(skip)]
    pub stable: bool,
}

/// Right-hand side of a registration: either a full definition or a bare
/// default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyDef {
    Meta {
        #[serde(rename = "DefaultValue")]
        default_value: Json,

        #[serde(rename = "Format", default)]
        format: Option<Format>,

        #[serde(rename = "Description", default)]
        description: String,
    },
    Default(Json),
}

impl KeyDef {
    pub fn meta(default_value: impl Into<String>, format: Format, description: impl Into<String>) -> Self {
        KeyDef::Meta {
            default_value: Json::String(default_value.into()),
            format: Some(format),
            description: description.into(),
        }
    }

    fn into_meta(self, stable: bool, composite: &str) -> Result<KeyMeta, ConfigError> {
        let (default, format, description) = match self {
            KeyDef::Meta {
                default_value,
                format,
                description,
            } => (default_value, format, description),
            KeyDef::Default(default) => (default, None, String::new()),
        };
        let format = format.unwrap_or_else(|| Format::infer(&default));
        let default_value = match default {
            Json::String(s) => s,
            Json::Number(n) => n.to_string(),
            Json::Bool(b) => (if b { "1" } else { "0" }).to_string(),
            Json::Null => String::new(),
            Json::Array(_) | Json::Object(_) => {
                return Err(ConfigError::InvalidKeyDefinition(composite.to_string()))
            }
        };
        Ok(KeyMeta {
            default_value,
            format,
            description,
            stable,
        })
    }
}

impl From<&str> for KeyDef {
    fn from(s: &str) -> Self {
        KeyDef::Default(Json::String(s.to_string()))
    }
}

impl From<String> for KeyDef {
    fn from(s: String) -> Self {
        KeyDef::Default(Json::String(s))
    }
}

impl From<i64> for KeyDef {
    fn from(n: i64) -> Self {
        KeyDef::Default(Json::from(n))
    }
}

impl From<f64> for KeyDef {
    fn from(n: f64) -> Self {
        KeyDef::Default(Json::from(n))
    }
}

/// Registry of built-in keys and their metadata.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    metas: BTreeMap<String, KeyMeta>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key definitions.
    ///
    /// Keys are given as `name[,Flag1,Flag2...]`. Redefining a key fails with
    /// [`ConfigError::DuplicateKey`] unless `allow_overwrite` is set; nothing
    /// is registered if any definition in the batch is rejected.
    pub fn register<I, K>(&mut self, defs: I, allow_overwrite: bool) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, KeyDef)>,
        K: AsRef<str>,
    {
        let mut staged: BTreeMap<String, KeyMeta> = BTreeMap::new();
        for (composite, def) in defs {
            let composite = composite.as_ref();
            let record = Record::parse(composite);
            if record.name.is_empty() {
                return Err(ConfigError::InvalidKeyDefinition(composite.to_string()));
            }
            if !allow_overwrite
                && (self.metas.contains_key(&record.name) || staged.contains_key(&record.name))
            {
                return Err(ConfigError::DuplicateKey(record.name));
            }
            let meta = def.into_meta(record.has_flag(STABLE_FLAG), composite)?;
            staged.insert(record.name, meta);
        }
        self.metas.extend(staged);
        Ok(())
    }

    /// Register definitions from a deserialized mapping, e.g. a defaults
    /// document `{"svc.timeout,Stable": {"DefaultValue": "30", ...}}`.
    pub fn register_json(&mut self, defs: Json, allow_overwrite: bool) -> Result<(), ConfigError> {
        let map = match defs {
            Json::Object(map) => map,
            other => return Err(ConfigError::InvalidKeyDefinition(other.to_string())),
        };
        let mut parsed = Vec::with_capacity(map.len());
        for (composite, raw) in map {
            let def: KeyDef = serde_json::from_value(raw)
                .map_err(|_| ConfigError::InvalidKeyDefinition(composite.clone()))?;
            parsed.push((composite, def));
        }
        self.register(parsed, allow_overwrite)
    }

    pub fn get(&self, key: &str) -> Option<&KeyMeta> {
        self.metas.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.metas.contains_key(key)
    }

    /// True iff the key is known and flagged stable.
    pub fn is_stable(&self, key: &str) -> bool {
        self.metas.get(key).is_some_and(|m| m.stable)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_composite_key() {
        let mut registry = KeyRegistry::new();
        registry
            .register(
                [(
                    "svc.timeout,Stable",
                    KeyDef::meta("30", Format::Integer, "Request timeout"),
                )],
                false,
            )
            .unwrap();

        let meta = registry.get("svc.timeout").unwrap();
        assert_eq!(meta.default_value, "30");
        assert_eq!(meta.format, Format::Integer);
        assert!(registry.is_stable("svc.timeout"));
        assert!(!registry.contains("svc.timeout,Stable"));
    }

    #[test]
    fn test_shorthand_default_infers_format() {
        let mut registry = KeyRegistry::new();
        registry
            .register(
                [
                    ("a", KeyDef::from(10_i64)),
                    ("b", KeyDef::from(0.5_f64)),
                    ("c", KeyDef::from("text")),
                ],
                false,
            )
            .unwrap();

        assert_eq!(registry.get("a").unwrap().format, Format::Integer);
        assert_eq!(registry.get("a").unwrap().default_value, "10");
        assert_eq!(registry.get("b").unwrap().format, Format::Float);
        assert_eq!(registry.get("c").unwrap().format, Format::String);
        assert!(!registry.is_stable("a"));
    }

    #[test]
    fn test_duplicate_rejected_without_overwrite() {
        let mut registry = KeyRegistry::new();
        registry.register([("k", KeyDef::from("1"))], false).unwrap();

        let err = registry
            .register([("k,Stable", KeyDef::from("2"))], false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKey(ref k) if k == "k"));
        assert_eq!(registry.get("k").unwrap().default_value, "1");
    }

    #[test]
    fn test_overwrite_replaces_metadata() {
        let mut registry = KeyRegistry::new();
        registry.register([("k", KeyDef::from("1"))], false).unwrap();
        registry
            .register([("k,Stable", KeyDef::from("2"))], true)
            .unwrap();

        assert_eq!(registry.get("k").unwrap().default_value, "2");
        assert!(registry.is_stable("k"));
    }

    #[test]
    fn test_rejected_batch_registers_nothing() {
        let mut registry = KeyRegistry::new();
        registry.register([("k", KeyDef::from("1"))], false).unwrap();

        let result = registry.register([("fresh", KeyDef::from("x")), ("k", KeyDef::from("2"))], false);
        assert!(result.is_err());
        assert!(!registry.contains("fresh"));
    }

    #[test]
    fn test_register_json_document() {
        let mut registry = KeyRegistry::new();
        registry
            .register_json(
                json!({
                    "svc.timeout,Stable": {
                        "DefaultValue": "30",
                        "Format": "Integer",
                        "Description": "Request timeout"
                    },
                    "svc.retries": 3
                }),
                false,
            )
            .unwrap();

        assert!(registry.is_stable("svc.timeout"));
        assert_eq!(registry.get("svc.timeout").unwrap().description, "Request timeout");
        assert_eq!(registry.get("svc.retries").unwrap().default_value, "3");
    }

    #[test]
    fn test_structured_default_is_invalid() {
        let mut registry = KeyRegistry::new();
        let err = registry
            .register([("k", KeyDef::Default(json!(["a"])))], false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeyDefinition(_)));
    }
}
