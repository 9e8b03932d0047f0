//! # kp CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Verifies the top-level behavior of the `kp` binary: the standard `--help`
//! and `--version` flags and argument validation done by clap.
//!

mod common;
use common::kp_cmd;
use predicates::prelude::*;

#[test]
fn test_help_flag() {
    kp_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--container"))
        .stdout(predicate::str::contains("--pod"))
        .stdout(predicate::str::contains("<SOURCE>"))
        .stdout(predicate::str::contains("<DESTINATION>"));
}

#[test]
fn test_version_flag() {
    kp_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_positional_arguments() {
    kp_cmd()
        .args(["-c", "web-1", "./only-source"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DESTINATION"));
}

#[test]
fn test_invalid_timeout_value() {
    kp_cmd()
        .args(["-c", "web-1", "--timeout", "soon", "a", "/opt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}
