//! Smoke tests for the CLI surface — no database required.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_command_groups() {
    Command::cargo_bin("sko")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("db")
                .and(predicate::str::contains("item"))
                .and(predicate::str::contains("stock"))
                .and(predicate::str::contains("plan"))
                .and(predicate::str::contains("audit"))
                .and(predicate::str::contains("forecast")),
        );
}

#[test]
fn forecast_rejects_malformed_dates() {
    Command::cargo_bin("sko")
        .unwrap()
        .args(["forecast", "--date", "not-a-date"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --date"));
}

#[test]
fn audit_verify_reports_missing_files() {
    Command::cargo_bin("sko")
        .unwrap()
        .args(["audit", "verify", "/nonexistent/journal.jsonl"])
        .assert()
        .failure();
}
