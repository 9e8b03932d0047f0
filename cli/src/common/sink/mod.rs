//! # kp Extraction Sinks (`common::sink`)
//!
//! File: cli/src/common/sink/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! An extraction sink is the process on the receiving end of the tar stream: a
//! container runtime's `exec` facility running `tar` inside the container. kp
//! never talks to a container directly; it starts the sink as a subprocess and
//! writes the archive into its stdin.
//!
//! ## Architecture
//!
//! - **`ExtractionSink`**: The strategy trait. An implementation only knows how to
//!   build its `tokio::process::Command`; starting the process with piped stdio
//!   and naming it in errors and logs are provided methods.
//! - **`docker`**: `DockerExecSink`, runs `docker exec -i <container> tar ...`.
//! - **`kubectl`**: `KubectlExecSink`, runs `kubectl exec <pod> ... -i -- tar ...`.
//!
//! All variants run the same container-side command, built by
//! `tar_extract_args`:
//!
//! ```text
//! tar xmf - -C <extract_root> --no-same-owner
//! ```
//!
//! `m` leaves modification times at extraction time and `--no-same-owner` makes
//! files owned by the exec user, matching what a plain copy would do.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::sink::{docker::DockerExecSink, ExtractionSink};
//!
//! # fn run() -> crate::core::error::Result<()> {
//! let sink = DockerExecSink::new("docker", "web-1", "/");
//! println!("Starting {}", sink.describe());
//! let child = sink.start()?;
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{KpError, Result};
use anyhow::anyhow;
use std::{ffi::OsString, path::Path, process::Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

pub mod docker;
pub mod kubectl;

/// A subprocess that extracts a tar stream read from its stdin.
pub trait ExtractionSink: Send + Sync {
    /// The command to run. Stdio configuration is applied by `start`.
    fn command(&self) -> Command;

    /// Human readable command line, used in logs and error messages.
    fn describe(&self) -> String {
        let command = self.command();
        let command = command.as_std();
        let mut line = command.get_program().to_string_lossy().into_owned();
        for arg in command.get_args() {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Spawns the sink with all three standard streams piped.
    ///
    /// The child is killed if its handle is dropped before it exits.
    fn start(&self) -> Result<Child> {
        let mut command = self.command();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Starting extraction sink: {}", self.describe());
        command.spawn().map_err(|e| {
            anyhow!(KpError::SinkStart {
                sink: self.describe(),
                source: e,
            })
        })
    }
}

/// Container-side arguments: `tar xmf - -C <root> --no-same-owner`.
pub fn tar_extract_args(root: &Path) -> Vec<OsString> {
    vec![
        "tar".into(),
        "xmf".into(),
        "-".into(),
        "-C".into(),
        root.as_os_str().to_os_string(),
        "--no-same-owner".into(),
    ]
}
