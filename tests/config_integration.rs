//! Integration tests for settings files
//!
//! Loading, discovery, and how settings change engine behaviour on disk

use rewrite_apply::config::{discover, load_from_path, ConfigError, DEFAULT_SETTINGS_FILE};
use rewrite_apply::{Action, Engine, EngineError, OffsetEncoding, SafetyError, TestResult};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_settings(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join(DEFAULT_SETTINGS_FILE);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_settings_file() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(
        &dir,
        r#"
# Offsets from a JavaScript engine
offset_encoding = "utf16"
forbidden = [".git", "node_modules"]
"#,
    );

    let settings = load_from_path(&path).unwrap();

    assert_eq!(settings.offset_encoding, OffsetEncoding::Utf16);
    assert_eq!(
        settings.forbidden,
        vec![PathBuf::from(".git"), PathBuf::from("node_modules")]
    );
    assert!(settings.verify_source);
    assert!(settings.guard_workspace);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let err = load_from_path(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn test_parse_error_carries_path() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "offset_encoding = \"latin1\"\n");

    let err = load_from_path(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
    assert!(err.to_string().contains(DEFAULT_SETTINGS_FILE));
}

#[test]
fn test_validation_error_lists_every_issue() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "forbidden = [\"/etc\", \"/var\"]\n");

    let err = load_from_path(&path).unwrap_err();
    let message = err.to_string();

    assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
    assert!(message.contains("/etc"));
    assert!(message.contains("/var"));
}

#[test]
fn test_explicit_path_wins_over_discovery() {
    let dir = TempDir::new().unwrap();
    write_settings(&dir, "offset_encoding = \"bytes\"\n");
    let explicit = dir.path().join("other.toml");
    fs::write(&explicit, "offset_encoding = \"utf16\"\n").unwrap();

    let discovered = discover(None, dir.path()).unwrap();
    let chosen = discover(Some(explicit.as_path()), dir.path()).unwrap();

    assert_eq!(discovered.offset_encoding, OffsetEncoding::Bytes);
    assert_eq!(chosen.offset_encoding, OffsetEncoding::Utf16);
}

#[test]
fn test_custom_forbidden_directory_blocks_writes() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "forbidden = [\"vendor\"]\n");
    let settings = load_from_path(&path).unwrap();
    let mut engine = Engine::on_disk(dir.path(), &settings).unwrap();
    let mut results = vec![TestResult::new(
        "vendor/lib.rb",
        vec![Action::add_file("patched")],
    )];

    let err = engine.apply_action(&mut results, 0, 0).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Unsafe(SafetyError::ForbiddenPath { .. })
    ));
    assert!(!dir.path().join("vendor/lib.rb").exists());
}

#[test]
fn test_disabled_guard_and_verification() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "verify_source = false\nguard_workspace = false\n");
    let settings = load_from_path(&path).unwrap();
    fs::write(dir.path().join("a.rb"), "changed on disk").unwrap();

    let mut engine = Engine::on_disk(dir.path(), &settings).unwrap();
    let mut results =
        vec![TestResult::new("a.rb", vec![Action::replace(0, 5, "HELLO")]).with_source("hello")];

    let _ = engine.apply_result(&mut results, 0).unwrap();

    assert!(results.is_empty());
    assert_eq!(fs::read_to_string(dir.path().join("a.rb")).unwrap(), "HELLO");
}
