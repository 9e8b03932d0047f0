//! # kp Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module groups the filesystem-facing parts of kp. Today that is the
//! path mapper, which turns a local source path and a container destination
//! into the list of objects to transfer.
//!
//! ## Architecture
//!
//! - **`mapper`**: Walks the source (lexically, symlinks are never followed)
//!   and pairs every object with its absolute destination path. Also hosts
//!   `clean_path`, the lexical normaliser applied to user supplied paths.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::mapper;
//! use std::path::Path;
//!
//! # fn run() -> crate::core::error::Result<()> {
//! let set = mapper::map_paths(Path::new("./dist"), Path::new("/srv/www"))?;
//! println!("{} entries to copy", set.len());
//! # Ok(())
//! # }
//! ```
//!

/// Source walking and destination path mapping (`map_paths`, `clean_path`).
pub mod mapper;
