//! # kp Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module is the root of the copy engine. The command layer (`commands::`)
//! only parses arguments and wires these pieces together; everything that
//! touches files, archives or processes lives here.
//!
//! ## Architecture
//!
//! - **`fs`**: The path mapper. Walks the source and computes where each object
//!   lands in the container.
//! - **`archive`**: The streaming tar archiver fed by the mapper's output.
//! - **`sink`**: The `ExtractionSink` trait and its `docker exec` and
//!   `kubectl exec` variants.
//! - **`process`**: The pipeline that runs the archiver and a sink concurrently
//!   and collects the sink's output.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::{archive::tar::{ArchiveOptions, Archiver}, fs::mapper, process, sink::docker::DockerExecSink};
//! use std::path::Path;
//!
//! # async fn run() -> crate::core::error::Result<()> {
//! let set = mapper::map_paths(Path::new("./dist"), Path::new("/srv/www"))?;
//! let sink = DockerExecSink::new("docker", "web-1", "/");
//! let report = process::stream_to_sink(&sink, set, Archiver::new(ArchiveOptions::default()), None).await?;
//! # Ok(())
//! # }
//! ```
//!

/// The streaming tar archiver.
pub mod archive;
/// Source walking and destination path mapping.
pub mod fs;
/// Runs the archiver into an extraction sink with concurrent output draining.
pub mod process;
/// Extraction sinks (`docker exec`, `kubectl exec`).
pub mod sink;
