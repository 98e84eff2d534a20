//! layerconf - layered configuration for long-lived services
//!
//! Merges built-in defaults, a self-expanding chain of configuration files
//! and a mutable key-value store into one view, with per-key metadata,
//! named parameter-set overrides and typed accessors.

pub mod config;
pub mod parse;

pub use config::{
    ConfigError, Configuration, ConfigurationBuilder, KeyDef, KeyMeta, Format, ResolvedKey,
};
pub use layerconf_kv::{FileStore, KvStore, MemoryStore};
