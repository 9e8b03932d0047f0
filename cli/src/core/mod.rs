//! # kp Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components shared by the
//! copy engine and the command layer.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, merging, and validation
//! - `error`: Error types (`KpError`, `UnsupportedEntry`) and the `Result` alias
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{KpError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
