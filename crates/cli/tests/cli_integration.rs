//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `bikeshare` binary and verify exit codes,
//! stdout and stderr. Each test works in its own temporary directory so
//! ledger files never leak between tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PROVIDER_ORG: &str = "ProviderOrgMSP";
const PROVIDER_CA: &str = "ca.providerorg.bikeshare.com";

fn bikeshare(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("bikeshare");
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn ledger(dir: &TempDir) -> PathBuf {
    dir.path().join("ledger.json")
}

/// `bikeshare invoke --dev --ledger <dir>/ledger.json <function> <args...>`
fn dev_invoke(dir: &TempDir, function: &str, args: &[&str]) -> Command {
    let mut cmd = bikeshare(dir.path());
    cmd.arg("invoke")
        .arg("--dev")
        .arg("--ledger")
        .arg(ledger(dir))
        .arg(function)
        .args(args);
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = tempfile::tempdir().unwrap();
    bikeshare(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bike-share workflow engine"));
}

#[test]
fn version_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    bikeshare(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bikeshare"));
}

// ──────────────────────────────────────────────
// 2. Operations
// ──────────────────────────────────────────────

#[test]
fn operations_lists_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    bikeshare(dir.path())
        .arg("operations")
        .assert()
        .success()
        .stdout(predicate::str::contains("startRide"))
        .stdout(predicate::str::contains(
            "{User ID, Bike ID, Longitude, Latitude}",
        ))
        .stdout(predicate::str::contains("Provider/User/Repairer"));
}

#[test]
fn operations_json_has_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let out = bikeshare(dir.path())
        .args(["--output", "json", "operations"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let ops: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ops = ops.as_array().unwrap();
    assert_eq!(ops.len(), 19);
    let end_ride = ops.iter().find(|op| op["name"] == "endRide").unwrap();
    assert_eq!(end_ride["arity"], 4);
    assert_eq!(end_ride["roles"], serde_json::json!(["User"]));
}

// ──────────────────────────────────────────────
// 3. Invoke
// ──────────────────────────────────────────────

#[test]
fn invoke_creates_the_ledger_file() {
    let dir = tempfile::tempdir().unwrap();
    dev_invoke(&dir, "registerBike", &["b1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("registerBike: ok"));
    assert!(ledger(&dir).exists());

    dev_invoke(&dir, "getBikesByStatus", &["AVAILABLE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Key\""))
        .stdout(predicate::str::contains("\"id\": \"b1\""));
}

#[test]
fn invoke_prints_derived_ids() {
    let dir = tempfile::tempdir().unwrap();
    dev_invoke(&dir, "registerUser", &["u1", "10"])
        .assert()
        .success();
    dev_invoke(&dir, "registerBike", &["b1"]).assert().success();
    dev_invoke(&dir, "startRide", &["u1", "b1", "-73.98", "40.75"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("u1-b1-"));
}

#[test]
fn failed_invoke_leaves_the_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    dev_invoke(&dir, "registerBike", &["b1"]).assert().success();
    let before = fs::read_to_string(ledger(&dir)).unwrap();

    dev_invoke(&dir, "registerBike", &["b1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "conflict error: Bike b1 already registered.",
        ));
    assert_eq!(fs::read_to_string(ledger(&dir)).unwrap(), before);
}

#[test]
fn invoke_without_identity_fails_outside_dev_mode() {
    let dir = tempfile::tempdir().unwrap();
    bikeshare(dir.path())
        .args(["invoke", "registerBike", "b1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "identity error: Error extracting creator identity info",
        ));
    assert!(!ledger(&dir).exists());
}

#[test]
fn invoke_checks_the_callers_role() {
    let dir = tempfile::tempdir().unwrap();
    bikeshare(dir.path())
        .args(["invoke", "registerBike", "b1"])
        .args(["--org", PROVIDER_ORG, "--issuer", PROVIDER_CA])
        .assert()
        .success();

    bikeshare(dir.path())
        .args(["invoke", "registerBike", "b2"])
        .args(["--org", "UserOrgMSP", "--issuer", "ca.userorg.bikeshare.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Caller not a member of Provider Org. Access denied.",
        ));
}

#[test]
fn invoke_json_error_format() {
    let dir = tempfile::tempdir().unwrap();
    let out = bikeshare(dir.path())
        .args(["--output", "json", "invoke", "--dev", "stealBike", "b1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(
        err["error"],
        "invalid_operation error: Invalid invoke function name."
    );
}

#[test]
fn invoke_reports_wrong_arity() {
    let dir = tempfile::tempdir().unwrap();
    dev_invoke(&dir, "registerUser", &["u1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Incorrect number of arguments. Expecting 2: {User ID, Balance}. Found 1.",
        ));
}

// ──────────────────────────────────────────────
// 4. Replay
// ──────────────────────────────────────────────

fn write_script(dir: &TempDir, steps: serde_json::Value) -> PathBuf {
    let path = dir.path().join("script.json");
    fs::write(&path, steps.to_string()).unwrap();
    path
}

#[test]
fn replay_runs_a_full_ride() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        &dir,
        serde_json::json!([
            {"function": "registerUser", "args": ["u1", "10"]},
            {"function": "registerBike", "args": ["b1"]},
            {"function": "startRide", "args": ["u1", "b1", "7", "45"], "at": 1000},
            {"function": "endRide", "args": ["u1", "b1", "7.1", "45.1"], "at": 1600},
            {"function": "getRidesByStatus", "args": ["COMPLETED"]}
        ]),
    );

    let out = bikeshare(dir.path())
        .args(["--output", "json", "replay", "--dev"])
        .arg(&script)
        .arg("--ledger")
        .arg(ledger(&dir))
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let steps: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(steps[2]["payload"], "u1-b1-1000");
    let ride = &steps[4]["payload"][0]["Value"];
    assert_eq!(ride["id"], "u1-b1-1000");
    assert_eq!(ride["endTime"], 1600);
    assert!(ledger(&dir).exists());
}

#[test]
fn replay_stops_at_the_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        &dir,
        serde_json::json!([
            {"function": "registerBike", "args": ["b1"]},
            {"function": "startRide", "args": ["ghost", "b1", "0", "0"]},
            {"function": "registerBike", "args": ["b2"]}
        ]),
    );

    bikeshare(dir.path())
        .args(["replay", "--dev"])
        .arg(&script)
        .arg("--ledger")
        .arg(ledger(&dir))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "step 2 (startRide): not_found error: User ghost not found.",
        ))
        .stdout(predicate::str::contains("3.").not());
    assert!(!ledger(&dir).exists());
}

#[test]
fn replay_uses_per_step_callers() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        &dir,
        serde_json::json!([
            {"function": "registerBike", "args": ["b1"], "org": PROVIDER_ORG, "issuer": PROVIDER_CA},
            {"function": "discardBike", "args": ["b1"]}
        ]),
    );
    bikeshare(dir.path())
        .arg("replay")
        .arg(&script)
        .arg("--ledger")
        .arg(ledger(&dir))
        .assert()
        .failure()
        .stderr(predicate::str::contains("step 2 (discardBike): identity error"));
}

// ──────────────────────────────────────────────
// 5. Configuration
// ──────────────────────────────────────────────

#[test]
fn check_config_accepts_a_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        "dev_mode = false\n\n[pricing]\nrate_per_minute = \"0.2\"\n\n[ids]\ncollision = \"reject\"\n",
    )
    .unwrap();
    bikeshare(dir.path())
        .arg("check-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn check_config_rejects_missing_dev_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(&path, "[pricing]\nrate_per_minute = \"0.2\"\n").unwrap();
    bikeshare(dir.path())
        .arg("check-config")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("dev_mode"));
}

#[test]
fn config_file_drives_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        "dev_mode = true\n\n[bikes]\ndiscard_discarded = \"ignore\"\n",
    )
    .unwrap();
    let invoke = |args: &[&str]| {
        let mut cmd = bikeshare(dir.path());
        cmd.arg("invoke")
            .arg("--config")
            .arg(&path)
            .arg("--ledger")
            .arg(ledger(&dir))
            .args(args);
        cmd
    };
    invoke(&["registerBike", "b1"]).assert().success();
    invoke(&["discardBike", "b1"]).assert().success();
    invoke(&["discardBike", "b1"]).assert().success();
}
