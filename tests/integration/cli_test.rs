//! CLI tests for the lexicheck binary
//!
//! Every run points `--config` into a temp dir so the user's own
//! configuration never leaks into results.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command with an isolated (missing) config file.
fn lexicheck(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lexicheck").unwrap();
    cmd.arg("--config")
        .arg(temp.path().join("config.toml"))
        .env_remove("LEXICHECK_LOG");
    cmd
}

// ============================================================================
// Help and Completions
// ============================================================================

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("errors"))
        .stdout(predicate::str::contains("tone"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn completions_for_bash() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .args(["completions", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_lexicheck"));
}

#[test]
fn unknown_command_fails() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp).arg("proofread").assert().failure();
}

// ============================================================================
// check
// ============================================================================

#[test]
fn check_reads_stdin() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .arg("check")
        .write_stdin("Teh quick brown fox")
        .assert()
        .success()
        .stdout(predicate::str::contains("1:1"))
        .stdout(predicate::str::contains("\"Teh\" -> \"the\""))
        .stdout(predicate::str::contains("1 issue(s): 1 error"));
}

#[test]
fn check_reads_file() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("notes.txt");
    fs::write(&input, "All fine here.\nWe could of left earlier.").unwrap();

    lexicheck(&temp)
        .arg("check")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("2:4"))
        .stdout(predicate::str::contains("could have"));
}

#[test]
fn check_clean_text() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .arg("check")
        .write_stdin("Everything is fine.")
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found (rules)."));
}

#[test]
fn check_json_output() {
    let temp = TempDir::new().unwrap();
    let output = lexicheck(&temp)
        .args(["check", "--json"])
        .write_stdin("Teh quick brown fox")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["origin"], "fallback");
    assert_eq!(value["sourceTextLength"], 19);
    assert_eq!(value["suggestions"][0]["offset"], 0);
    assert_eq!(value["suggestions"][0]["length"], 3);
    assert_eq!(value["suggestions"][0]["category"], "spelling");
    assert_eq!(value["suggestions"][0]["originalText"], "Teh");
}

#[test]
fn check_missing_file_fails_with_path() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .args(["check", "/nonexistent/lexicheck-input.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lexicheck-input.txt"));
}

#[test]
fn check_respects_max_text_chars() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[engine]\nmax_text_chars = 8\n",
    )
    .unwrap();

    lexicheck(&temp)
        .arg("check")
        .write_stdin("Fine so far. Teh end")
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"))
        .stdout(predicate::str::contains("first 8 characters"));
}

#[test]
fn verbose_prints_summary_to_stderr() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .args(["check", "-v"])
        .write_stdin("Teh end")
        .assert()
        .success()
        .stderr(predicate::str::contains("Analysis Summary:"))
        .stderr(predicate::str::contains("Fallbacks: 1"));
}

// ============================================================================
// errors and tone
// ============================================================================

#[test]
fn errors_explains_log_lines() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .arg("errors")
        .write_stdin("INFO starting\nERROR bind: Address already in use\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2:"))
        .stdout(predicate::str::contains("The port is already taken"));
}

#[test]
fn tone_without_model_is_neutral() {
    let temp = TempDir::new().unwrap();
    lexicheck(&temp)
        .arg("tone")
        .write_stdin("Thanks for your patience!")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tone: neutral (score 50/100, rules)"));
}

#[test]
fn tone_json_output() {
    let temp = TempDir::new().unwrap();
    let output = lexicheck(&temp)
        .args(["tone", "--json"])
        .write_stdin("Just do it.")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["label"], "neutral");
    assert_eq!(value["origin"], "fallback");
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_path_prints_explicit_path() {
    let temp = TempDir::new().unwrap();
    let expected = temp.path().join("config.toml");
    lexicheck(&temp)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy().to_string()));
}

#[test]
fn config_show_merges_file_with_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), "[cache]\ncapacity = 7\n").unwrap();

    lexicheck(&temp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 7"))
        .stdout(predicate::str::contains("token_limit = 900"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[engine]\ntoken_limit = 0\n",
    )
    .unwrap();

    lexicheck(&temp)
        .arg("check")
        .write_stdin("text")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token_limit"));
}

#[test]
fn config_reset_writes_defaults_and_backup() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "[cache]\ncapacity = 7\n").unwrap();

    lexicheck(&temp)
        .args(["config", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backed up to"))
        .stdout(predicate::str::contains("Config reset to defaults"));

    assert!(fs::read_to_string(&path).unwrap().contains("capacity = 100"));
    assert!(fs::read_to_string(temp.path().join("config.toml.bak"))
        .unwrap()
        .contains("capacity = 7"));
}
