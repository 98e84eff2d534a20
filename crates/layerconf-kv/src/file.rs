//! JSON-file-backed key-value store.
//!
//! The whole store is one JSON document:
//! `{"schema_version": 1, "entries": {"<key>": {"value": "...", "expires_at": "..."}}}`
//!
//! Every read goes to disk so that separate processes sharing the file see
//! each other's writes. Writes hold an exclusive advisory lock on a sibling
//! `.<name>.lock` file for the whole load, modify and persist cycle, and
//! replace the document by renaming a temp file over it. Writers to distinct
//! keys never drop each other's entries, even across processes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::entry::StoredEntry;
use crate::error::StoreError;
use crate::KvStore;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default = "default_schema_version")]
    schema_version: u32,

    #[serde(default)]
    entries: BTreeMap<String, StoredEntry>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Store persisted as a single JSON file.
pub struct FileStore {
    path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    ///
    /// The file is not created until the first write; a missing file reads
    /// as an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            clock,
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string())
    }

    /// Take the cross-process writer lock. Released when the file is dropped.
    fn lock_document(&self) -> Result<fs::File, StoreError> {
        let dir = self.directory();
        fs::create_dir_all(&dir)?;
        let lock_path = dir.join(format!(".{}.lock", self.file_name()));
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file.lock_exclusive()?;
        Ok(lock_file)
    }

    fn load(&self) -> Result<StoreDocument, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let dir = self.directory();
        let temp_name = format!(
            ".{}.tmp.{}.{}",
            self.file_name(),
            std::process::id(),
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        );
        let temp_path = dir.join(temp_name);

        let json = serde_json::to_vec_pretty(document)?;
        let result = fs::File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&json)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&temp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

impl KvStore for FileStore {
    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let now = self.clock.now();
        let document = self.load()?;
        Ok(document
            .entries
            .into_iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key, entry.value))
            .collect())
    }

    fn read_one(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let mut document = self.load()?;
        Ok(document
            .entries
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    fn write(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let lock_file = self.lock_document()?;
        let now = self.clock.now();
        let mut document = self.load()?;

        // Expired entries are dropped whenever the document is rewritten
        document.entries.retain(|_, entry| entry.is_live(now));
        document
            .entries
            .insert(key.to_string(), StoredEntry::new(value, ttl, now)?);
        document.schema_version = SCHEMA_VERSION;

        let persisted = self.persist(&document);
        drop(lock_file);
        persisted?;
        debug!(path = %self.path.display(), key, "wrote store entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("kv.json"));

        assert!(store.read_all().unwrap().is_empty());
        assert_eq!(store.read_one("anything").unwrap(), None);
    }

    #[test]
    fn test_write_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.json");

        FileStore::open(&path)
            .write("svc.timeout", "45", Duration::ZERO)
            .unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(
            reopened.read_one("svc.timeout").unwrap(),
            Some("45".to_string())
        );
    }

    #[test]
    fn test_write_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("kv.json"));
        store.write("a", "1", Duration::ZERO).unwrap();
        store.write("b", "2", Duration::ZERO).unwrap();
        store.write("a", "3", Duration::ZERO).unwrap();

        let all = store.read_all().unwrap();
        assert_eq!(all.get("a"), Some(&"3".to_string()));
        assert_eq!(all.get("b"), Some(&"2".to_string()));
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert!(matches!(
            store.read_all(),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("kv.json"));
        store.write("a", "1", Duration::from_secs(60)).unwrap();

        let temps: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.contains(".tmp."))
            .collect();
        assert!(temps.is_empty(), "leftover temp files: {:?}", temps);
        assert!(dir.path().join("kv.json").exists());
    }

    #[test]
    fn test_independent_writers_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = FileStore::open(&path);
                    for n in 0..25 {
                        store
                            .write(&format!("w{}.k{}", writer, n), "v", Duration::ZERO)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in writers {
            handle.join().unwrap();
        }

        let all = FileStore::open(&path).read_all().unwrap();
        assert_eq!(all.len(), 100);
        assert!(all.contains_key("w0.k0"));
        assert!(all.contains_key("w3.k24"));
    }
}
