//! # kp Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module holds the archive side of a copy: turning a mapped set of source
//! paths into the byte stream the container-side `tar` extracts.
//!
//! ## Architecture
//!
//! - **`tar`**: The streaming archiver (`Archiver`, `ArchiveOptions`,
//!   `ArchiveSummary`). Writes uncompressed GNU tar into any `std::io::Write`.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::tar::{ArchiveOptions, Archiver};
//!
//! let archiver = Archiver::new(ArchiveOptions::default());
//! // archiver.write_archive(writer, &transfer_set)?;
//! ```
//!

pub mod tar;
