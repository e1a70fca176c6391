#![allow(missing_docs)]

mod support;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use sombra_consistency::StoreSnapshot;
use tempfile::TempDir;

use support::consistent_snapshot;

fn write_snapshot(dir: &TempDir, name: &str, snapshot: &StoreSnapshot) -> PathBuf {
    let path = dir.path().join(format!("{name}.json"));
    let json = serde_json::to_string_pretty(snapshot).expect("serialize snapshot");
    fs::write(&path, json).expect("write snapshot");
    path
}

fn broken_snapshot() -> StoreSnapshot {
    let mut snapshot = consistent_snapshot();
    snapshot.nodes[1].next_prop = Some(40);
    snapshot
}

/// The binary with its config lookup confined to `home`.
fn checker(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("sombra-check");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("SOMBRA_CHECK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn consistent_snapshot_exits_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_snapshot(&dir, "consistent", &consistent_snapshot());
    let output = checker(dir.path())
        .args(["--theme", "plain", "check"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf-8");
    assert!(!stdout.contains("ERROR:"), "{stdout}");
    assert!(stdout.contains("No inconsistencies found"), "{stdout}");
}

#[test]
fn inconsistent_snapshot_exits_with_two() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_snapshot(&dir, "broken", &broken_snapshot());
    let output = checker(dir.path())
        .args(["--quiet", "check", "--order", "single-threaded"])
        .arg(&path)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf-8");
    assert!(
        stdout.contains(
            "ERROR: The property record referenced is not in use.\n\
             \tNodeRecord[1,used=true,rel=0,prop=40]\n\
             \tInconsistent with: 40\n"
        ),
        "{stdout}"
    );
    assert!(stdout.contains("Inconsistencies found: "), "{stdout}");
}

#[test]
fn json_report_lists_counts_and_messages() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_snapshot(&dir, "broken", &broken_snapshot());
    let output = checker(dir.path())
        .args(["--format", "json", "check", "--check-property-owners"])
        .arg(&path)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["summary"]["consistent"], Value::Bool(false));
    assert_eq!(json["summary"]["errors"], 1);
    assert_eq!(json["summary"]["types"][0]["record_type"], "NODE");
    assert_eq!(json["options"]["check_property_owners"], Value::Bool(true));
    assert_eq!(json["options"]["execution_order"], "MULTI_THREADED");
    assert_eq!(json["config"], Value::Null);
    let messages = json["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[1]
        .as_str()
        .is_some_and(|m| m.starts_with("Inconsistencies found: ")));
}

#[test]
fn config_file_selects_multiple_passes() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_snapshot(&dir, "consistent", &consistent_snapshot());
    let config = dir.path().join("check.toml");
    fs::write(
        &config,
        "consistency_check_multiple_passes = true\nconsistency_check_property_owners = true\n",
    )
    .expect("write config");

    let output = checker(dir.path())
        .args(["--format", "json", "check", "--config"])
        .arg(&config)
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["options"]["execution_order"], "MULTI_PASS");
    assert_eq!(json["config"], Value::String(config.display().to_string()));
    assert_eq!(json["options"]["check_property_owners"], Value::Bool(true));
    assert_eq!(json["summary"]["consistent"], Value::Bool(true));
}

#[test]
fn order_flag_overrides_the_config_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_snapshot(&dir, "consistent", &consistent_snapshot());
    let config = dir.path().join("check.toml");
    fs::write(&config, "consistency_check_multiple_passes = true\n").expect("write config");

    let output = checker(dir.path())
        .args(["--format", "json", "check", "--order", "single-threaded"])
        .env("SOMBRA_CHECK_CONFIG", &config)
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["options"]["execution_order"], "SINGLE_THREADED");
}

#[test]
fn missing_snapshot_is_a_failure() {
    let dir = TempDir::new().expect("tempdir");
    let output = checker(dir.path())
        .arg("check")
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8");
    assert!(stderr.contains("error: failed to read snapshot"), "{stderr}");
}
