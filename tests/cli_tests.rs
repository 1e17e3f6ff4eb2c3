//! Integration tests for the CLI interface
//!
//! Every run gets its own home, working and cache directory, and no API
//! token, so the binary serves synthetic data without touching the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ab_report(sandbox: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ab-report").unwrap();
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env("XDG_CONFIG_HOME", sandbox.path().join("config"))
        .env("AB_CACHE_DIR", sandbox.path().join("cache"))
        .env_remove("AB_API_TOKEN")
        .env_remove("AB_API_URL")
        .env_remove("AB_PROJECT_ID")
        .env_remove("USE_MOCK_DATA")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help_default() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_cli_help_flag() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("metrics"));
}

#[test]
fn test_invalid_command() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_metrics_lists_catalogue() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .arg("metrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("order_cnt"))
        .stdout(predicate::str::contains("bad_query_rate"));
}

#[test]
fn test_fetch_without_token_prints_synthetic_report() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["fetch", "1001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Experiment 1001 summary"))
        .stdout(predicate::str::contains("[Control Group] (control)"))
        .stdout(predicate::str::contains("ctr: +13.33%"));
}

#[test]
fn test_fetch_json_omits_raw_payload() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["fetch", "1001", "30", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"synthetic\""))
        .stdout(predicate::str::contains("\"project_id\": 30"))
        .stdout(predicate::str::contains("\"by_group\""))
        .stdout(predicate::str::contains("\"raw\"").not());
}

#[test]
fn test_fetch_rejects_malformed_dates() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["fetch", "1001", "--dates", "2024-13-01,2024-01-14"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_fetch_rejects_reversed_dates() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["fetch", "1001", "--dates", "2024-02-01,2024-01-01"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_config_file_fails() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["fetch", "1001", "--config", "missing.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_compare_two_experiments() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["compare", "1001,1002", "--sort-by", "ctr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Experiment comparison (2 experiments)"))
        .stdout(predicate::str::contains("+13.33%"))
        .stdout(predicate::str::contains("Ranked by ctr:"))
        .stdout(predicate::str::contains("1. Experiment 1001: +13.33% (synthetic)"))
        .stdout(predicate::str::contains("Synthetic data used for:"));
}

#[test]
fn test_compare_json_flags_synthetic_rows() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["compare", "1001,1002", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"synthetic\""))
        .stdout(predicate::str::contains("\"1002\": \"mock mode\""));
}

#[test]
fn test_compare_needs_two_ids() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["compare", "1001"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at least two"));
}

#[test]
fn test_cache_stats_on_empty_cache() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["cache", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 0"));
}

#[test]
fn test_cache_clear() {
    let sandbox = TempDir::new().unwrap();
    ab_report(&sandbox)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 cached result(s)"));
}
