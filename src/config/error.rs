//! Configuration errors.

use layerconf_kv::StoreError;

/// Errors raised while building or reading a configuration session.
///
/// Load-time variants (`ResourceLoad`, `Parse`) are contained by the file
/// loader: they are logged and the offending locator is skipped. Read-time
/// variants are returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Double definition of key '{0}'")]
    DuplicateKey(String),

    #[error("Invalid key definition '{0}'")]
    InvalidKeyDefinition(String),

    #[error("Failed to load '{locator}': {reason}")]
    ResourceLoad { locator: String, reason: String },

    #[error("Failed to parse '{locator}': {reason}")]
    Parse { locator: String, reason: String },

    #[error("{status}")]
    UnknownKey { key: String, status: String },

    #[error("Failed to parse config key '{key}' as {expected} (value '{value}'): {reason}")]
    ValueParse {
        key: String,
        expected: &'static str,
        value: String,
        reason: String,
    },

    #[error("Active parameter set is '{0}' but no parameter set with this name exists")]
    MisconfiguredParameterSet(String),

    #[error("No dynamic store is attached to this session")]
    NoDynamicStore,

    #[error("Dynamic store error: {0}")]
    Store(#[from] StoreError),
}

impl ConfigError {
    pub(crate) fn value_parse(
        key: &str,
        expected: &'static str,
        value: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        ConfigError::ValueParse {
            key: key.to_string(),
            expected,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
