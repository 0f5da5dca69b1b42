//! Integration tests for the CLI binary.
//!
//! Verifies that the `nid` binary responds to basic flags and can drive a
//! store end to end.
//!
//! This test is registered as a [[test]] in the nats-identity-cli crate
//! so that CARGO_BIN_EXE_nid is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `nid` binary.
fn nid_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nid"))
}

fn nid(store: &Path, args: &[&str]) -> Output {
    nid_binary()
        .env_remove("NID_HOME")
        .arg("--store")
        .arg(store)
        .args(args)
        .output()
        .expect("failed to execute nid")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "nid failed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn cli_responds_to_help() {
    let output = nid_binary()
        .arg("--help")
        .output()
        .expect("failed to execute nid --help");

    assert!(
        output.status.success(),
        "nid --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("nid") || stdout.contains("nats-identity") || stdout.contains("Usage"),
        "nid --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = nid_binary()
        .arg("--version")
        .output()
        .expect("failed to execute nid --version");

    assert!(
        output.status.success(),
        "nid --version should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("0.1") || stdout.contains("nid"),
        "nid --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = nid_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute nid");

    assert!(
        !output.status.success(),
        "nid with unknown flag should exit with error"
    );
}

#[test]
fn cli_issues_hierarchy_and_generates_creds() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path();

    let operator = stdout_json(&nid(store, &["operator", "issue", "op1"]));
    assert_eq!(operator["status"]["operator"]["jwt"], true);

    stdout_json(&nid(store, &["account", "issue", "op1", "acc1"]));
    let template = r#"{"claimsTemplate":{"nats":{"pub":{"allow":["svc.{{id}}"]}}},"expirationS":60}"#;
    stdout_json(&nid(
        store,
        &["user", "issue", "op1", "acc1", "u1", "--data", template],
    ));

    let output = nid(store, &["creds", "op1", "acc1", "u1", "--parameters", "id=7"]);
    assert!(
        output.status.success(),
        "creds failed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let creds = String::from_utf8_lossy(&output.stdout);
    assert!(creds.starts_with("-----BEGIN NATS USER JWT-----"));
    assert!(creds.contains("-----BEGIN USER NKEY SEED-----"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Expires:"));

    let output = nid(store, &["creds", "op1", "acc1", "u1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("id"));

    let nkey = stdout_json(&nid(store, &["nkey", "read", "op1", "acc1", "u1"]));
    assert!(nkey["publicKey"].as_str().unwrap().starts_with('U'));

    let listed = nid(store, &["account", "list", "op1"]);
    assert_eq!(String::from_utf8_lossy(&listed.stdout).trim(), "acc1");
}

#[test]
fn cli_rejects_user_jwt_path() {
    let tmp = tempfile::tempdir().unwrap();
    let output = nid(tmp.path(), &["jwt", "read", "op1", "acc1", "u1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr)
        .to_lowercase()
        .contains("unsupported path"));
}

#[test]
fn cli_sealed_store_requires_same_passphrase() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path();

    let output = nid_binary()
        .env("NID_TEST_PASS", "correct horse")
        .args(["--passphrase-env", "NID_TEST_PASS", "--store"])
        .arg(store)
        .args(["operator", "issue", "op1"])
        .output()
        .expect("failed to execute nid");
    assert!(output.status.success());

    let output = nid_binary()
        .env("NID_TEST_PASS", "wrong")
        .args(["--passphrase-env", "NID_TEST_PASS", "--store"])
        .arg(store)
        .args(["operator", "read", "op1"])
        .output()
        .expect("failed to execute nid");
    assert!(!output.status.success());
}
