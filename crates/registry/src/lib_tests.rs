use super::*;
use std::fs;
use tempfile::tempdir;

fn write_registry(dir: &std::path::Path, json: &str) {
    fs::write(dir.join("registry.json"), json).unwrap();
}

#[test]
fn load_resolves_enabled_entries_relative_to_base() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"PC01/hands","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();

    let producers = registry.producers();
    assert_eq!(producers.len(), 1);
    assert_eq!(producers[0].id.as_str(), "PC01");
    assert_eq!(producers[0].watch_path, dir.path().join("PC01/hands"));
}

#[test]
fn load_excludes_disabled_entries() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"a","enabled":false},{"id":"PC02","watch_path":"b","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();

    assert_eq!(registry.len(), 1);
    assert!(registry.get(&ProducerId::new("PC01")).is_none());
    assert!(registry.get(&ProducerId::new("PC02")).is_some());
}

#[test]
fn missing_file_yields_empty_table_not_fatal() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(dir.path(), "does-not-exist.json");
    registry.load();
    assert!(registry.is_empty());
}

#[test]
fn malformed_json_on_first_load_yields_empty_table() {
    let dir = tempdir().unwrap();
    write_registry(dir.path(), "{not json");
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();
    assert!(registry.is_empty());
}

#[test]
fn malformed_json_on_reload_keeps_prior_table() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"a","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();
    assert_eq!(registry.len(), 1);

    // bump mtime and corrupt content
    std::thread::sleep(std::time::Duration::from_millis(10));
    write_registry(dir.path(), "{not json");

    let diff = registry.reload();
    assert!(diff.is_some());
    assert_eq!(registry.len(), 1, "prior table must not be discarded");
}

#[test]
fn duplicate_id_later_entry_wins() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"first","enabled":true},{"id":"PC01","watch_path":"second","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();

    assert_eq!(registry.len(), 1);
    let producer = registry.get(&ProducerId::new("PC01")).unwrap();
    assert_eq!(producer.watch_path, dir.path().join("second"));
}

#[test]
fn reload_without_change_returns_none() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"a","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();
    assert!(registry.reload().is_none());
}

#[test]
fn reload_reports_added_and_removed() {
    let dir = tempdir().unwrap();
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC01","watch_path":"a","enabled":true}]}"#,
    );
    let registry = Registry::new(dir.path(), "registry.json");
    registry.load();

    std::thread::sleep(std::time::Duration::from_millis(10));
    write_registry(
        dir.path(),
        r#"{"pcs":[{"id":"PC02","watch_path":"b","enabled":true}]}"#,
    );

    let diff = registry.reload().expect("mtime advanced");
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.added[0].id.as_str(), "PC02");
    assert_eq!(diff.removed, vec![ProducerId::new("PC01")]);
}
