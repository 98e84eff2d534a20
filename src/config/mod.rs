//! Layered configuration resolver
//!
//! Resolves keys across three kinds of layers, lowest priority first:
//! 1. Built-in defaults (the key registry)
//! 2. Files loaded from `config.loaded_files` and session locators
//! 3. The dynamic key-value store
//!
//! Within a layer, the active parameter set overrides the flat value.

mod accessor;
mod audit;
mod defaults;
mod dynamic;
mod error;
mod layer;
mod loader;
mod parameter_set;
mod registry;
mod resolver;
mod session;
mod value;

pub use audit::AuditReport;
pub use defaults::{
    ACTIVE_PARAMETER_SET, DEFAULT_LOADED_FILES, DEFAULT_TTL, DUMP_CONFIGURATION,
    IGNORED_WARNING_KEYS, LIST_SEPARATOR, LOADED_FILES, MAX_FILE_HIERARCHY_DEPTH,
};
pub use dynamic::DynamicStoreAdapter;
pub use error::ConfigError;
pub use layer::{Layer, LayerInfo, LayerKind, LayerRef, LayerStack, BUILTIN_SOURCE};
pub use loader::{
    parse_document, DocumentFormat, FileLoader, LoadReport, MemoryLoader, ResourceLoader,
    StandardLoader, INTERNAL_SCHEME,
};
pub use parameter_set::ParameterSets;
pub use registry::{Format, KeyDef, KeyMeta, KeyRegistry, STABLE_FLAG};
pub use resolver::{resolve, KeyReport, ResolvedKey};
pub use session::{Configuration, ConfigurationBuilder};
pub use value::Value;
