//! A stored value with its optional expiration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::StoreError;

/// One entry in a key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,

    /// When the entry stops being visible (None = never)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    /// Build an entry written at `now` with the given TTL. A zero TTL never expires.
    pub fn new(value: &str, ttl: Duration, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let delta = chrono::Duration::from_std(ttl).map_err(|_| StoreError::InvalidTtl(ttl))?;
            Some(
                now.checked_add_signed(delta)
                    .ok_or(StoreError::InvalidTtl(ttl))?,
            )
        };
        Ok(Self {
            value: value.to_string(),
            expires_at,
        })
    }

    /// Returns true if the entry is still visible at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}
