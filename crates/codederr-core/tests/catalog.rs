//! Fixture-driven tests for JSON coder catalogs loaded into isolated registries.

use codederr_core::{CoderRegistry, ErrCode, RegistryError};
use serde_json::json;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn fixture_path(name: &str) -> std::path::PathBuf {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures");
    p.push(name);
    p
}

fn load_fixture(name: &str) -> CoderRegistry {
    let reg = CoderRegistry::new();
    reg.load_file(&fixture_path(name)).expect("fixture catalog");
    reg
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn catalog_loads_all_entries() {
    let reg = load_fixture("coders.json");
    assert_eq!(reg.len(), 4);
    assert_eq!(reg.codes(), ["100001", "100002", "100003", "200001"]);
}

#[test]
fn catalog_fields_and_defaults() {
    let reg = load_fixture("coders.json");

    let c = reg.get_coder("100001").unwrap();
    assert_eq!(c.status_code(), 400);
    assert_eq!(c.message(), "invalid params");
    assert_eq!(c.reference(), "https://docs.example.com/errors/100001");
    assert!(c.params().is_none());

    let c = reg.get_coder("200001").unwrap();
    assert_eq!(c.status_code(), 500);
}

#[test]
fn catalog_full_message_uses_params() {
    let reg = load_fixture("coders.json");
    let c = reg.get_coder("100002").unwrap();
    assert_eq!(c.params().unwrap()["id"], json!(42));
    assert_eq!(c.full_message(), "user 42 not found");
}

#[test]
fn catalog_messages_feed_construction() {
    let reg = load_fixture("coders.json");
    let root = reg.new_code("100003", &[]);
    let err = reg.wrap_code(Some(root), "200001", &[]).unwrap();

    assert_eq!(err.to_string(), "200001 - database unavailable: 100003 - token expired");
    assert_eq!(reg.parse_coder(Some(&err)).unwrap().status_code(), 500);
}

#[test]
fn duplicate_catalog_overwrites_on_load() {
    let reg = load_fixture("coders-duplicate.json");
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.get_coder("300001").unwrap().message(), "conflict again");
}

#[test]
fn duplicate_catalog_detected_with_try_register() {
    let content = std::fs::read_to_string(fixture_path("coders-duplicate.json")).unwrap();
    let coders: Vec<ErrCode> = serde_json::from_str(&content).unwrap();

    let reg = CoderRegistry::new();
    let dups: Vec<String> = coders
        .into_iter()
        .filter_map(|c| match reg.try_register(c) {
            Err(RegistryError::AlreadyExists { code }) => Some(code),
            _ => None,
        })
        .collect();
    assert_eq!(dups, ["300001"]);
}

#[test]
fn missing_catalog_is_io_error() {
    let reg = CoderRegistry::new();
    let err = reg.load_file(&fixture_path("does-not-exist.json")).unwrap_err();
    assert!(matches!(err, RegistryError::Io(_)));
}
