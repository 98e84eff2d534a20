//! Key listing, dumps and the stability audit.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use super::defaults::DUMP_CONFIGURATION;
use super::layer::BUILTIN_SOURCE;
use super::resolver::KeyReport;
use super::session::Configuration;
use super::value::Value;

const COMMENT_PREFIX: char = '#';
const PARAMETER_SET_MARKER: char = '[';

/// Result of [`Configuration::audit`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// Resolved keys, stable and unstable
    pub keys: BTreeMap<String, KeyReport>,

    /// Warnings emitted, after suppression
    pub warnings: Vec<String>,
}

impl Configuration {
    /// Visible key names across all layers, in first-seen load order.
    ///
    /// Comment (`#...`) and parameter-set marker (`[...`) entries, sequences,
    /// and groups on non-built-in layers are skipped.
    pub fn keys(&self, prefix: Option<&str>, stable_only: bool) -> Vec<String> {
        let registry = self.stack.registry();
        let mut keys: Vec<String> = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for layer in self.stack.in_load_order() {
            for key in layer.key_names() {
                if key.starts_with(COMMENT_PREFIX) || key.starts_with(PARAMETER_SET_MARKER) {
                    continue;
                }
                if stable_only && !registry.is_stable(key) {
                    continue;
                }
                if prefix.is_some_and(|p| !key.starts_with(p)) {
                    continue;
                }
                if matches!(layer.entry(key), Some(Value::Sequence | Value::Group(_))) {
                    continue;
                }
                if seen.insert(key) {
                    keys.push(key.to_string());
                }
            }
        }
        keys
    }

    /// Resolve every visible key.
    pub fn dump_all(&self, stable_only: bool) -> BTreeMap<String, KeyReport> {
        self.keys(None, stable_only)
            .into_iter()
            .map(|key| {
                let report = KeyReport::from(self.get_extended(&key));
                (key, report)
            })
            .collect()
    }

    fn is_warning_suppressed(&self, key: &str) -> bool {
        self.ignored_warning_patterns
            .iter()
            .any(|re| re.is_match(key))
    }

    /// Warn about misconfigured keys and about non-stable keys overridden
    /// outside the built-in layer, unless `config.ignored_warning_keys`
    /// suppresses them. Logs the whole report when
    /// `config.dump_configuration` is set.
    pub fn audit(&self) -> AuditReport {
        let registry = self.stack.registry();
        let mut report = AuditReport::default();

        for (key, info) in self.dump_all(false) {
            if !info.stable && !self.is_warning_suppressed(&key) {
                if info.status.starts_with("[WARNING]") {
                    report.warnings.push(info.status.clone());
                }
                if registry.contains(&key) && info.origin != BUILTIN_SOURCE {
                    report.warnings.push(format!(
                        "Non STABLE key '{}' defined in '{}'! /!\\ WARNING /!\\ Its semantic and/or existence MAY change in future releases!!",
                        key, info.origin
                    ));
                }
            }
            report.keys.insert(key, info);
        }

        for warning in &report.warnings {
            warn!("{}", warning);
        }

        if self.get_bool(DUMP_CONFIGURATION).unwrap_or(false) {
            match serde_json::to_string_pretty(&report.keys) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to serialize configuration dump: {}", e),
            }
            info!("Loaded files: {:?}", self.load_report().loaded);
        }
        report
    }
}
