//! Active parameter set tracking.

use tracing::warn;

use super::defaults::ACTIVE_PARAMETER_SET;
use super::error::ConfigError;
use super::layer::{LayerRef, LayerStack};
use super::value::Value;

/// Tracks which named override group is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSets {
    active: Option<String>,
}

impl ParameterSets {
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Derive the active set from the layers, highest priority first.
    ///
    /// The first layer defining `config.active_parameter_set` wins; on the
    /// built-in layer its registered default is used. An empty value clears
    /// the active set.
    pub fn refresh_active(&mut self, stack: &LayerStack) {
        let declared = stack.by_priority().find_map(|layer| match layer {
            LayerRef::Builtin(_) => layer
                .meta(ACTIVE_PARAMETER_SET)
                .map(|m| m.default_value.clone()),
            LayerRef::Loaded(_) => layer
                .entry(ACTIVE_PARAMETER_SET)
                .and_then(Value::as_scalar)
                .map(str::to_string),
        });
        self.assign(declared, stack);
    }

    /// Set the active parameter set explicitly. An empty name clears it.
    pub fn set_active(&mut self, name: &str, stack: &LayerStack) {
        self.assign(Some(name.to_string()), stack);
    }

    fn assign(&mut self, name: Option<String>, stack: &LayerStack) {
        self.active = name.filter(|n| !n.is_empty());
        if let Err(e) = self.sanity_check(stack) {
            warn!("{}", e);
        }
    }

    /// Verify that the active set, if any, exists as a group on some layer.
    pub fn sanity_check(&self, stack: &LayerStack) -> Result<(), ConfigError> {
        let Some(name) = self.active.as_deref() else {
            return Ok(());
        };
        if stack.by_priority().any(|layer| layer.group(name).is_some()) {
            Ok(())
        } else {
            Err(ConfigError::MisconfiguredParameterSet(name.to_string()))
        }
    }
}
