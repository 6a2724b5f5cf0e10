//! Ledger round trips through the JSON file storage.

use figma_sync::ledger::{
    ChangeReason, Classification, JsonFileLedgerStorage, Ledger, LedgerStorage,
};

fn file_storage(dir: &std::path::Path) -> Box<JsonFileLedgerStorage> {
    Box::new(JsonFileLedgerStorage::new(dir.join(".figma-sync").join("ledger.json")))
}

#[test]
fn recorded_state_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let icon_path = dir.path().join("home.svg");
    std::fs::write(&icon_path, b"<svg/>").unwrap();

    let mut ledger = Ledger::load(file_storage(dir.path()), "file-key").unwrap();
    ledger.record_color("brandRed", "0xFFFF0000", "Brand/Red");
    ledger
        .record_icon("3:1", "home.svg", "https://cdn/home", &icon_path)
        .unwrap();
    ledger.persist().unwrap();

    let raw = std::fs::read_to_string(dir.path().join(".figma-sync/ledger.json")).unwrap();
    assert!(raw.contains("\"sourceDocumentKey\": \"file-key\""));
    assert!(raw.contains("\"remoteLocator\": \"https://cdn/home\""));

    let reloaded = Ledger::load(file_storage(dir.path()), "file-key").unwrap();
    assert!(reloaded.record().last_sync.is_some());
    assert_eq!(
        reloaded.classify_color("brandRed", "0xFFFF0000", "Brand/Red"),
        Classification::Unchanged
    );
    assert_eq!(
        reloaded.classify_icon("3:1", "home.svg", "https://cdn/home", &icon_path),
        Classification::Unchanged
    );
    assert_eq!(
        reloaded.classify_color("brandRed", "0xFF00FF00", "Brand/Red"),
        Classification::Changed(ChangeReason::ValueChanged)
    );
}

#[test]
fn corrupt_file_starts_fresh_and_is_replaced_on_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".figma-sync/ledger.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{\"version\": \"1.0\", \"icons\": [").unwrap();

    let mut ledger = Ledger::load(file_storage(dir.path()), "file-key").unwrap();
    assert!(ledger.record().colors.is_empty());
    assert!(ledger.record().icons.is_empty());

    ledger.record_color("surface", "0xFFFFFFFF", "Surface");
    ledger.persist().unwrap();
    let record = JsonFileLedgerStorage::new(&path).read().unwrap().unwrap();
    assert_eq!(record.colors.len(), 1);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn unknown_schema_version_is_treated_as_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(
        &path,
        r#"{"version":"9.9","lastSync":null,"sourceDocumentKey":"file-key","colors":{},"icons":{}}"#,
    )
    .unwrap();

    let ledger = Ledger::load(Box::new(JsonFileLedgerStorage::new(&path)), "file-key").unwrap();
    assert_eq!(ledger.record().version, "1.0");
}

#[test]
fn clear_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(dir.path());
    assert!(!storage.clear().unwrap());

    let mut ledger = Ledger::load(file_storage(dir.path()), "file-key").unwrap();
    ledger.persist().unwrap();
    assert!(storage.clear().unwrap());
    assert!(storage.read().unwrap().is_none());
}
