//! Tests for the unvault binary

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PASSWORD_VAR: &str = "UNVAULT_CLI_TEST_PASSWORD";

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("vault.yml");
    fs::write(
        &path,
        format!(
            "providers:\n  - type: env\n    params:\n      var: {PASSWORD_VAR}\n{extra}"
        ),
    )
    .unwrap();
    path
}

fn unvault(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("unvault").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("UNVAULT_CONFIG")
        .env(PASSWORD_VAR, "correct horse")
        .arg("--config")
        .arg(config);
    cmd
}

fn encrypt(config: &Path, plaintext: &str) -> String {
    let output = unvault(config)
        .arg("encrypt")
        .write_stdin(plaintext)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_reveal_stdin() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let token = encrypt(&config, "hunter2\n");
    assert!(token.starts_with("$ANSIBLE_VAULT;1.1;AES256\n"));

    unvault(&config)
        .write_stdin(format!("password: {token}user: admin\n"))
        .assert()
        .success()
        .stdout("password: hunter2\nuser: admin\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_reveal_files_in_order() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    fs::write(&first, format!("a={}", encrypt(&config, "1"))).unwrap();
    fs::write(&second, format!("b={}", encrypt(&config, "2"))).unwrap();

    unvault(&config)
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout("a=1\nb=2\n");
}

#[test]
fn test_wrong_password_reports_on_stderr() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "placeholder: \"<redacted>\"\n");
    let token = encrypt(&config, "value");

    unvault(&config)
        .env(PASSWORD_VAR, "wrong")
        .write_stdin(format!("x {token}"))
        .assert()
        .code(1)
        .stdout("x <redacted>\n")
        .stderr(
            predicate::str::contains("-:2..")
                .and(predicate::str::contains("no_matching_identity")),
        );
}

#[test]
fn test_json_diagnostics() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = unvault(&config)
        .arg("--json")
        .write_stdin("$ANSIBLE_VAULT;1.1;AES256\n616\n")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "<<DECRYPTION_FAILED>>\n");

    let stderr = String::from_utf8(output.stderr).unwrap();
    let line = stderr
        .lines()
        .find(|line| line.contains("error_kind"))
        .unwrap();
    let record: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(record["input"], "-");
    assert_eq!(record["span_start"], 0);
    assert_eq!(record["error_kind"], "malformed_token");
}

#[test]
fn test_missing_password_is_cache_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let token = encrypt(&config, "value");

    unvault(&config)
        .env_remove(PASSWORD_VAR)
        .arg("--placeholder")
        .arg("?")
        .write_stdin(format!("{token}{token}"))
        .assert()
        .code(1)
        .stdout("?\n?\n")
        .stderr(predicate::str::contains("provider_setup_failed").count(1));
}

#[test]
fn test_text_without_tokens_passes_through() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    unvault(&config)
        .env_remove(PASSWORD_VAR)
        .write_stdin("echo $HOME; cost $5\n")
        .assert()
        .success()
        .stdout("echo $HOME; cost $5\n");
}

#[test]
fn test_unreadable_config_exits_2() {
    let dir = TempDir::new().unwrap();

    unvault(&dir.path().join("missing.yml"))
        .write_stdin("text")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing.yml"));
}

#[test]
fn test_unreadable_input_exits_2() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    unvault(&config)
        .arg(dir.path().join("absent.txt"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("absent.txt"));
}

#[test]
fn test_stdin_named_twice_exits_2() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    unvault(&config)
        .arg("-")
        .arg("-")
        .write_stdin("text")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("stdin"));
}

#[test]
fn test_rust_log_controls_library_logging() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let token = encrypt(&config, "value");

    unvault(&config)
        .env("RUST_LOG", "unvault=debug")
        .write_stdin(token)
        .assert()
        .success()
        .stdout("value\n")
        .stderr(predicate::str::contains("Building vault decryption context"));
}

#[test]
fn test_config_from_environment_variable() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let token = encrypt(&config, "from-env");

    let mut cmd = Command::cargo_bin("unvault").unwrap();
    cmd.env("UNVAULT_CONFIG", &config)
        .env(PASSWORD_VAR, "correct horse")
        .write_stdin(token)
        .assert()
        .success()
        .stdout("from-env\n");
}

#[test]
fn test_encrypt_with_named_identity() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    unvault(&config)
        .arg("encrypt")
        .arg("--id")
        .arg("prod")
        .write_stdin("value")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configured identities: default"));
}

#[test]
fn test_help() {
    Command::cargo_bin("unvault")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encrypt"));
}
