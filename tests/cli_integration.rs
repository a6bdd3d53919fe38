//! Integration tests for the command-line interface
//!
//! Drives the built binary against results files in a temporary workspace

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const RESULTS: &str = r#"[
  {
    "affected": true,
    "conflicted": false,
    "file_path": "foo.ts",
    "actions": [
      {"type": "replace", "start": 5, "end": 6, "new_code": "--"},
      {"type": "group", "start": 0, "end": 11, "actions": [
        {"type": "replace", "start": 0, "end": 5, "new_code": "hi"},
        {"type": "replace", "start": 6, "end": 11, "new_code": "foo"}
      ]}
    ]
  },
  {
    "affected": true,
    "conflicted": false,
    "file_path": "app/new.rb",
    "actions": [{"type": "add_file", "start": 0, "end": 0, "new_code": "class New; end"}]
  }
]"#;

/// Helper to create a workspace with one source file and a results file
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("foo.ts"), "hello world").unwrap();
    fs::write(dir.path().join("results.json"), RESULTS).unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rewrite-apply"))
        .args(args)
        .arg("--root")
        .arg(dir)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("REWRITE_APPLY_ROOT")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn saved(dir: &Path, name: &str) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_rewrite-apply"))
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["list", "preview", "apply", "skip"] {
        assert!(help.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_list_shows_actions_in_source_order() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["list", "-r", "results.json"]);

    assert!(output.status.success());
    let listing = stdout(&output);
    assert!(listing.contains("[0] foo.ts"));
    assert!(listing.contains("[1] app/new.rb"));
    // The group starts first, but keeps its original index
    let group = listing.find("[1] group").unwrap();
    let replace = listing.find("[0] replace 5..6").unwrap();
    assert!(group < replace);
    assert!(listing.contains("add file"));
}

#[test]
fn test_apply_single_action_saves_rebased_results() {
    let dir = setup_test_workspace();

    let output = run(
        dir.path(),
        &["apply", "-r", "results.json", "--result", "0", "--action", "1"],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hi foo");

    let pending = saved(dir.path(), "results.json");
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0]["file_source"], "hi foo");
    let action = &pending[0]["actions"][0];
    assert_eq!(action["type"], "replace");
    assert_eq!(action["start"], 2);
    assert_eq!(action["end"], 3);

    // The rebased action applies cleanly in a second run
    let output = run(
        dir.path(),
        &["apply", "-r", "results.json", "--result", "0", "--action", "0"],
    );
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hi--foo");
}

#[test]
fn test_apply_all() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["apply", "-r", "results.json"]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hi--foo");
    assert_eq!(
        fs::read_to_string(dir.path().join("app/new.rb")).unwrap(),
        "class New; end"
    );
    assert_eq!(saved(dir.path(), "results.json"), serde_json::json!([]));
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["apply", "-r", "results.json", "--dry-run"]);

    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("DRY RUN"));
    assert!(shown.contains("+hi--foo"));
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hello world");
    assert!(!dir.path().join("app/new.rb").exists());
    assert_eq!(fs::read_to_string(dir.path().join("results.json")).unwrap(), RESULTS);
}

#[test]
fn test_preview_single_result() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["preview", "-r", "results.json", "--result", "0"]);

    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("-hello world"));
    assert!(shown.contains("+hi--foo"));
    assert!(!shown.contains("class New"));
}

#[test]
fn test_skip_action_then_apply_result() {
    let dir = setup_test_workspace();

    let output = run(
        dir.path(),
        &["skip", "-r", "results.json", "--result", "0", "--action", "0"],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("Skipped"));
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hello world");

    let output = run(dir.path(), &["apply", "-r", "results.json", "--result", "0"]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hi foo");
}

#[test]
fn test_skip_whole_result() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["skip", "-r", "results.json", "--result", "1"]);

    assert!(output.status.success());
    let pending = saved(dir.path(), "results.json");
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["file_path"], "foo.ts");
}

#[test]
fn test_results_directory_requires_output() {
    let dir = setup_test_workspace();
    let runs = dir.path().join("runs");
    fs::create_dir(&runs).unwrap();
    fs::rename(dir.path().join("results.json"), runs.join("01.json")).unwrap();
    fs::write(runs.join("notes.txt"), "ignored").unwrap();

    let output = run(dir.path(), &["skip", "-r", "runs", "--result", "1"]);
    assert!(!output.status.success());

    let output = run(
        dir.path(),
        &["skip", "-r", "runs", "--result", "1", "-o", "pending.json"],
    );
    assert!(output.status.success());
    assert_eq!(saved(dir.path(), "pending.json").as_array().unwrap().len(), 1);
}

#[test]
fn test_engine_error_output_fails() {
    let dir = setup_test_workspace();
    fs::write(
        dir.path().join("results.json"),
        r#"{"error": "Invalid snippet"}"#,
    )
    .unwrap();

    let output = run(dir.path(), &["list", "-r", "results.json"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid snippet"));
}

#[test]
fn test_index_out_of_range_fails() {
    let dir = setup_test_workspace();

    let output = run(dir.path(), &["apply", "-r", "results.json", "--result", "7"]);

    assert!(!output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("foo.ts")).unwrap(), "hello world");
}
