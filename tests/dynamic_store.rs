//! Dynamic Store Tests
//!
//! A session backed by a file store shared with another session, as two
//! processes pointing at the same store would be.

use std::sync::Arc;
use std::time::Duration;

use layerconf::config::{MemoryLoader, DEFAULT_TTL};
use layerconf::{Configuration, FileStore, KeyDef, KvStore};

fn session(store: Arc<FileStore>, loader: MemoryLoader, locators: &str) -> Configuration {
    Configuration::builder()
        .loader(loader)
        .with_predefined_configuration(false)
        .locator(locators)
        .store(store, "shared")
        .register([
            ("svc.timeout".to_string(), KeyDef::from(30_i64)),
            ("svc.mode".to_string(), KeyDef::from("normal")),
        ])
        .build()
        .unwrap()
}

#[test]
fn test_store_overrides_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("kv.json")));
    store.write("svc.timeout", "99", Duration::ZERO).unwrap();

    let loader = MemoryLoader::new().with("a.yaml", "svc.timeout: 45\n");
    let config = session(store, loader, "a.yaml");

    assert_eq!(config.get_int("svc.timeout").unwrap(), 99);
    assert_eq!(
        config.get_extended("svc.timeout").origin,
        "Dynamic store 'shared'"
    );
}

#[test]
fn test_writes_visible_to_other_sessions_after_reread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.json");

    let mut writer = session(Arc::new(FileStore::open(&path)), MemoryLoader::new(), "");
    let mut reader = session(Arc::new(FileStore::open(&path)), MemoryLoader::new(), "");

    writer.set("svc.mode", "degraded", None).unwrap();
    assert_eq!(writer.get("svc.mode").unwrap(), "degraded");

    // The reader's snapshot is stale until it rereads; direct reads are fresh
    assert_eq!(reader.get("svc.mode").unwrap(), "normal");
    assert_eq!(
        reader.read_direct("svc.mode").unwrap(),
        Some("degraded".to_string())
    );

    reader.reread().unwrap();
    assert_eq!(reader.get("svc.mode").unwrap(), "degraded");
}

#[test]
fn test_parameter_set_activated_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("kv.json")));
    store
        .write("config.active_parameter_set", "fast", Duration::ZERO)
        .unwrap();

    let loader = MemoryLoader::new().with(
        "a.yaml",
        "svc.timeout: 45\nfast:\n  svc.timeout: 5\n",
    );
    let config = session(store, loader, "a.yaml");

    assert_eq!(config.active_parameter_set(), Some("fast"));
    assert_eq!(config.get_int("svc.timeout").unwrap(), 5);
}

#[test]
fn test_default_ttl_is_read_from_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("kv.json")));
    let loader = MemoryLoader::new().with("a.yaml", "config.default_ttl: 1h\n");
    let mut config = session(store, loader, "a.yaml");

    assert_eq!(
        config.get_duration(DEFAULT_TTL).unwrap(),
        Duration::from_secs(3600)
    );
    config.set("svc.mode", "temp", None).unwrap();

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("kv.json")).unwrap()).unwrap();
    assert!(document["entries"]["svc.mode"]["expires_at"].is_string());
}

#[test]
fn test_audit_flags_store_override_of_unstable_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("kv.json")));
    store.write("svc.mode", "degraded", Duration::ZERO).unwrap();

    let config = session(store, MemoryLoader::new(), "");
    let report = config.audit();

    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("'svc.mode'") && w.contains("Dynamic store 'shared'")));
}
