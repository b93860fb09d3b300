//! End-to-end tests for the command-line binary
//!
//! Only commands that never contact a model endpoint are exercised here.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn horoscope_agent(session_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("horoscope-agent").expect("binary should build");
    cmd.env_remove("RUST_LOG")
        .env("HOROSCOPE_SESSION_DIR", session_dir)
        .env("HOROSCOPE_HISTORY_PATH", "")
        .args(["--config", "does-not-exist.yaml"]);
    cmd
}

fn write_session(dir: &Path, id: &str) {
    std::fs::write(
        dir.join(format!("{}.jsonl", id)),
        concat!(
            "{\"role\":\"user\",\"content\":\"こんにちは\"}\n",
            "{\"role\":\"assistant\",\"content\":\"ようこそ\"}\n",
            "{\"role\":\"user\",\"content\":\"運勢は？\"}\n",
        ),
    )
    .unwrap();
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("horoscope-agent")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("session"));
}

#[test]
fn test_ask_requires_message() {
    let dir = TempDir::new().unwrap();
    horoscope_agent(dir.path()).arg("ask").assert().failure();
}

#[test]
fn test_session_show_prints_items() {
    let dir = TempDir::new().unwrap();
    write_session(dir.path(), "user-1");

    horoscope_agent(dir.path())
        .args(["session", "show", "--id", "user-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("こんにちは"))
        .stdout(predicate::str::contains("運勢は？"));
}

#[test]
fn test_session_show_with_limit() {
    let dir = TempDir::new().unwrap();
    write_session(dir.path(), "user-1");

    horoscope_agent(dir.path())
        .args(["session", "show", "--id", "user-1", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("運勢は？"))
        .stdout(predicate::str::contains("こんにちは").not());
}

#[test]
fn test_session_pop_removes_last_item() {
    let dir = TempDir::new().unwrap();
    write_session(dir.path(), "user-1");

    horoscope_agent(dir.path())
        .args(["session", "pop", "--id", "user-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"))
        .stdout(predicate::str::contains("運勢は？"));

    let contents = std::fs::read_to_string(dir.path().join("user-1.jsonl")).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn test_session_pop_on_missing_session() {
    let dir = TempDir::new().unwrap();

    horoscope_agent(dir.path())
        .args(["session", "pop", "--id", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is empty"));
}

#[test]
fn test_session_clear_empties_file() {
    let dir = TempDir::new().unwrap();
    write_session(dir.path(), "user-1");

    horoscope_agent(dir.path())
        .args(["session", "clear", "--id", "user-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 3 items"));

    let contents = std::fs::read_to_string(dir.path().join("user-1.jsonl")).unwrap();
    assert!(contents.is_empty());
}

#[test]
fn test_invalid_env_override_is_logged() {
    let dir = TempDir::new().unwrap();

    horoscope_agent(dir.path())
        .env("HOROSCOPE_MAX_ROUNDS", "many")
        .args(["session", "show", "--id", "user-1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Invalid HOROSCOPE_MAX_ROUNDS: many"))
        .stderr(predicate::str::contains("Config file not found"));
}
