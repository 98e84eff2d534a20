//! Governing keys (built-in layer)
//!
//! Keys that control the resolver itself. They are registered on every
//! session and resolve through the same layers as any other key.

use super::registry::{Format, KeyDef};

pub const DUMP_CONFIGURATION: &str = "config.dump_configuration";
pub const LOADED_FILES: &str = "config.loaded_files";
pub const MAX_FILE_HIERARCHY_DEPTH: &str = "config.max_file_hierarchy_depth";
pub const ACTIVE_PARAMETER_SET: &str = "config.active_parameter_set";
pub const DEFAULT_TTL: &str = "config.default_ttl";
pub const IGNORED_WARNING_KEYS: &str = "config.ignored_warning_keys";

/// Separator for locator lists and other list-valued keys.
pub const LIST_SEPARATOR: &str = ";";

/// Locators loaded when no layer overrides `config.loaded_files`.
pub const DEFAULT_LOADED_FILES: &str = "internal:predefined.config.yaml;internal:custom.config.yaml";

/// Fallback depth bound when the key cannot be read as an integer.
pub const DEFAULT_MAX_FILE_HIERARCHY_DEPTH: i64 = 10;

/// Keys registered before any file is loaded.
pub fn governing_keys(loaded_files: &str) -> Vec<(String, KeyDef)> {
    vec![
        (
            format!("{},Stable", DUMP_CONFIGURATION),
            KeyDef::meta(
                "0",
                Format::Bool,
                "Log every relevant configuration key with its origin. Used for debugging.",
            ),
        ),
        (
            format!("{},Stable", LOADED_FILES),
            KeyDef::meta(
                loaded_files,
                Format::StringList,
                "Semicolon-separated list of locators to load as configuration layers, in order.\n\n\
                 Re-evaluated after each loaded document, so a layer may declare further documents to load.",
            ),
        ),
        (
            MAX_FILE_HIERARCHY_DEPTH.to_string(),
            KeyDef::from(DEFAULT_MAX_FILE_HIERARCHY_DEPTH),
        ),
        (
            format!("{},Stable", ACTIVE_PARAMETER_SET),
            KeyDef::meta("", Format::String, "Name of the parameter set to activate."),
        ),
        (
            DEFAULT_TTL.to_string(),
            KeyDef::meta("0", Format::Duration, "Expiration applied to dynamic store writes. 0 never expires."),
        ),
    ]
}

/// Keys registered once file loading has completed.
pub fn audit_keys() -> Vec<(String, KeyDef)> {
    vec![(
        format!("{},Stable", IGNORED_WARNING_KEYS),
        KeyDef::meta(
            "",
            Format::StringList,
            "Key patterns whose usage warnings are suppressed.\n\n    Ex: ec2.schedule.key1;ec2.schedule.key2",
        ),
    )]
}
