//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn help_lists_the_push_subcommand() {
    let mut cmd = Command::cargo_bin("rulesync").expect("binary should build");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("push"));
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let mut cmd = Command::cargo_bin("rulesync").expect("binary should build");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn push_reads_the_desired_file_and_rejects_a_non_object_root() {
    let dir = tempdir().expect("temp dir should be created");
    let file = dir.path().join("desired.json");
    std::fs::write(&file, "[1, 2]").expect("desired file should be written");

    let mut cmd = Command::cargo_bin("rulesync").expect("binary should build");
    cmd.env("RULESYNC_BASE_URL", "https://tenant.example.com/api/v2")
        .env("RULESYNC_TOKEN", "test-token")
        .args(["push", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn push_reads_the_desired_file_and_reports_malformed_json() {
    let dir = tempdir().expect("temp dir should be created");
    let file = dir.path().join("desired.json");
    std::fs::write(&file, "{not json").expect("desired file should be written");

    let mut cmd = Command::cargo_bin("rulesync").expect("binary should build");
    cmd.env("RULESYNC_BASE_URL", "https://tenant.example.com/api/v2")
        .env("RULESYNC_TOKEN", "test-token")
        .args(["push", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to parse desired rules configs",
        ));
}

#[test]
fn push_with_a_missing_file_fails_with_a_diagnostic() {
    let mut cmd = Command::cargo_bin("rulesync").expect("binary should build");
    cmd.env("RULESYNC_BASE_URL", "https://tenant.example.com/api/v2")
        .env("RULESYNC_TOKEN", "test-token")
        .args(["push", "--file", "/nonexistent/desired.json"])
        .assert()
        .failure();
}
