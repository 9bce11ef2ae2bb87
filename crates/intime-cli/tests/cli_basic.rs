//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_intime"))
        .args(args)
        .env("INTIME_DATA_DIR", data_dir)
        .env_remove("INTIME_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_convert() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["convert", "106,987"]);
    assert_eq!(out["amount"], 106_987);
    assert_eq!(out["seconds"], 115_200);
    assert_eq!(out["compact"], "1일 8시간 0분 0초");
    assert_eq!(out["formatted_amount"], "106,987");
}

#[test]
fn test_register_then_status() {
    let dir = tempfile::tempdir().unwrap();
    let registered = run_json(dir.path(), &["register", "80240"]);
    assert_eq!(registered["type"], "registered");
    assert_eq!(registered["seconds"], 86_400);

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["type"], "state_snapshot");
    assert_eq!(status["state"], "running");
    let remaining = status["remaining_seconds"].as_u64().unwrap();
    assert!(remaining <= 86_400 && remaining >= 86_400 - 60);
}

#[test]
fn test_list_seeds_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let list = run_json(dir.path(), &["list", "--json"]);
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries.iter().filter(|e| e["active"] == true).count(), 1);

    // Reconciling the latest sample must not move it to today's key.
    let list = run_json(dir.path(), &["list", "--json"]);
    let keys: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["day_key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["2025-06-20", "2025-06-21", "2025-06-22"]);
    assert_eq!(list[2]["date"], "2025-06-22T00:00:00+09:00");

    let (stdout, _, code) = run_cli(dir.path(), &["list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("2025-06-20"));
    assert!(stdout.contains("₩175,525"));
}

#[test]
fn test_delete_active_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registered = run_json(dir.path(), &["register", "1000"]);
    let key = registered["day_key"].as_str().unwrap().to_string();

    let rejected = run_json(dir.path(), &["delete", &key]);
    assert_eq!(rejected["type"], "delete_rejected");

    let deleted = run_json(dir.path(), &["delete", "2025-06-20"]);
    assert_eq!(deleted["type"], "deleted");

    let list = run_json(dir.path(), &["list", "--json"]);
    assert_eq!(list.as_array().unwrap().len(), 3);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "wage.per_hour"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "10030.0");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "wage.per_hour", "20060"]);
    assert_eq!(code, 0);
    let out = run_json(dir.path(), &["convert", "106987"]);
    assert_eq!(out["seconds"], 57_600);

    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "wage.bogus", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}
