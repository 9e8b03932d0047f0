//! # kp Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the command implementations of the kp CLI and makes
//! them accessible to the main application entry point (`main.rs`).
//!
//! ## Commands
//!
//! - `copy`: Copy a local file or directory into a running container. This is
//!   the only command, so its arguments are the top-level arguments of `kp`.
//!

/// Copy a local path into a container through `docker exec` or `kubectl exec`.
pub mod copy;
