//! Layer entry values.
//!
//! Deserialized documents arrive as loosely typed trees. They are classified
//! once, when a layer is built, into [`Value`] so resolution never has to
//! re-inspect the raw shape.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;

/// An entry on a file or dynamic layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A plain value. Numbers and booleans are kept as their text form.
    Scalar(String),

    /// A named parameter set: overrides keyed by configuration key.
    Group(BTreeMap<String, Value>),

    /// A sequence. Never resolves; kept so that audits can see it.
    Sequence,
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Classify a deserialized tree node.
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::String(s) => Value::Scalar(s),
            Json::Number(n) => Value::Scalar(n.to_string()),
            Json::Bool(b) => Value::Scalar(b.to_string()),
            Json::Null => Value::Scalar(String::new()),
            Json::Array(_) => Value::Sequence,
            Json::Object(map) => Value::Group(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a TOML value into the same tree model as JSON and YAML.
    pub fn toml_to_json(toml: toml::Value) -> Json {
        match toml {
            toml::Value::String(s) => Json::String(s),
            toml::Value::Integer(i) => Json::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            toml::Value::Boolean(b) => Json::Bool(b),
            toml::Value::Datetime(dt) => Json::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Json::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Json::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_keep_text_form() {
        assert_eq!(Value::from_json(json!(45)), Value::Scalar("45".into()));
        assert_eq!(Value::from_json(json!(true)), Value::Scalar("true".into()));
        assert_eq!(Value::from_json(json!(0.5)), Value::Scalar("0.5".into()));
        assert_eq!(Value::from_json(json!(null)), Value::Scalar(String::new()));
    }

    #[test]
    fn test_mapping_becomes_group() {
        let value = Value::from_json(json!({"svc.timeout": "5", "bad": [1, 2]}));
        let group = value.as_group().unwrap();
        assert_eq!(group["svc.timeout"].as_scalar(), Some("5"));
        assert_eq!(group["bad"], Value::Sequence);
    }

    #[test]
    fn test_toml_conversion() {
        let toml: toml::Value = toml::from_str(
            r#"
            timeout = 900
            ratio = 0.25

            [fast]
            "svc.timeout" = "5"
            "#,
        )
        .unwrap();
        let json = Value::toml_to_json(toml);

        assert_eq!(json["timeout"], 900);
        assert_eq!(json["ratio"], 0.25);
        assert_eq!(json["fast"]["svc.timeout"], "5");
    }
}
