//! Key-value store backing the dynamic configuration layer.
//!
//! The resolver only needs three operations from the store: read every live
//! entry, read one entry, and write one entry with an expiration. Anything
//! implementing [`KvStore`] can serve as the highest-priority layer.
//!
//! Two stores ship with the crate:
//! - [`MemoryStore`]: process-local, used by tests and embedded sessions
//! - [`FileStore`]: a JSON document on disk, shared by every process that
//!   points at the same path

pub mod clock;
pub mod entry;
pub mod error;
pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::time::Duration;

pub use clock::{Clock, SystemClock};
pub use entry::StoredEntry;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Operations the configuration resolver needs from a key-value service.
///
/// Writes are independent per key; no multi-key transaction is offered.
pub trait KvStore: Send + Sync {
    /// Read every entry that has not expired.
    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError>;

    /// Read a single entry, bypassing any caching the caller may hold.
    fn read_one(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a single entry. A zero `ttl` never expires.
    fn write(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}
