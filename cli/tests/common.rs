//! # kp CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and uses these to run the compiled `kp` binary in an
//! isolated environment.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;

/// # Get kp Command (`kp_cmd`)
///
/// Creates an `assert_cmd::Command` for the compiled `kp` binary.
///
/// ## Panics
/// Panics if the `kp` binary cannot be found via `Command::cargo_bin`.
pub fn kp_cmd() -> Command {
    Command::cargo_bin("kp").expect("Failed to find kp binary for testing")
}

/// A `kp` command running in `workdir`, with `HOME` and the XDG config
/// directory pointed there too, so no user configuration leaks into the test.
pub fn isolated_kp_cmd(workdir: &Path) -> Command {
    let mut cmd = kp_cmd();
    cmd.current_dir(workdir)
        .env("HOME", workdir)
        .env("XDG_CONFIG_HOME", workdir.join(".config"))
        .env_remove("KP_NAMESPACE")
        .env_remove("RUST_LOG");
    cmd
}
