//! Typed accessors over resolved values.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::ConfigError;
use super::session::Configuration;
use crate::parse::{self, Record};

impl Configuration {
    /// Resolved value of `key`, or [`ConfigError::UnknownKey`] when no layer
    /// provides one.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let resolved = self.get_extended(key);
        match resolved.value {
            Some(value) if resolved.success => Ok(value),
            _ => Err(ConfigError::UnknownKey {
                key: key.to_string(),
                status: resolved.status,
            }),
        }
    }

    /// Tolerant variant of [`get`](Self::get).
    pub fn get_or_none(&self, key: &str) -> Option<String> {
        self.get(key).ok()
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        let value = self.get(key)?;
        value
            .trim()
            .parse()
            .map_err(|e| ConfigError::value_parse(key, "an integer", &value, e))
    }

    pub fn get_float(&self, key: &str) -> Result<f64, ConfigError> {
        let value = self.get(key)?;
        value
            .trim()
            .parse()
            .map_err(|e| ConfigError::value_parse(key, "a float", &value, e))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.get(key)?;
        parse::parse_bool(&value).map_err(|e| ConfigError::value_parse(key, "a boolean", &value, e))
    }

    /// Split the value on `separator`. An absent key or an empty value
    /// yields `default`.
    pub fn get_list(&self, key: &str, separator: &str, default: Vec<String>) -> Vec<String> {
        match self.get_or_none(key) {
            Some(value) if !value.is_empty() => {
                value.split(separator).map(str::to_string).collect()
            }
            _ => default,
        }
    }

    /// `;`-separated list; empty when the key is absent or the value is empty.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key, ";", Vec::new())
    }

    pub fn get_duration(&self, key: &str) -> Result<Duration, ConfigError> {
        let value = self.get(key)?;
        parse::parse_duration(&value)
            .map_err(|e| ConfigError::value_parse(key, "a duration", &value, e))
    }

    /// Date value; None when the value is empty.
    pub fn get_date(&self, key: &str) -> Result<Option<DateTime<Utc>>, ConfigError> {
        let value = self.get(key)?;
        if value.trim().is_empty() {
            return Ok(None);
        }
        parse::parse_date(&value)
            .map(Some)
            .map_err(|e| ConfigError::value_parse(key, "a date", &value, e))
    }

    pub fn get_list_of_records(&self, key: &str) -> Result<Vec<Record>, ConfigError> {
        Ok(parse::parse_records(&self.get(key)?))
    }

    /// `"25%"` of `max_value` (rounded up) or an absolute count.
    pub fn get_abs_or_percent(&self, key: &str, max_value: i64) -> Result<i64, ConfigError> {
        let value = self.get(key)?;
        parse::abs_or_percent(&value, max_value)
            .map_err(|e| ConfigError::value_parse(key, "an absolute value or percentage", &value, e))
    }
}
