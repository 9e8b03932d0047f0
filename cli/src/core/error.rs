//! # kp Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used throughout kp. Every failure of a
//! copy operation is fatal and ends up as a single `anyhow::Error` carrying one
//! of the `KpError` variants plus the context added on the way up (source,
//! destination, sink identity).
//!
//! ## Architecture
//!
//! The error system consists of three parts:
//! - `KpError`: the fatal error taxonomy, derived with `thiserror`.
//! - `UnsupportedEntry`: the non-fatal warning raised for entries that cannot be
//!   transferred faithfully (absolute symlinks, sockets, FIFOs, devices). It is
//!   logged and recorded in the archive summary, and only becomes fatal when the
//!   strict special-file policy wraps it in `KpError::Unsupported`.
//! - `Result<T>`: a type alias for `anyhow::Result<T>`.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! return Err(anyhow!(KpError::SourceNotFound { path, source: io_err }));
//!
//! // Pattern matching on error types
//! match result {
//!     Err(e) if matches!(e.downcast_ref::<KpError>(), Some(KpError::Timeout { .. })) => {
//!         println!("Transfer took too long");
//!     }
//!     other => other?,
//! }
//! ```
//!
use std::{io, path::PathBuf};
use thiserror::Error;

/// Fatal errors of a kp copy operation.
#[derive(Error, Debug)]
pub enum KpError {
    #[error("Source path '{}' not found: {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to enumerate '{}': {source}", .path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error while archiving '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Destination '{}' is outside the extraction root '{}'", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Refusing to copy unsupported entry: {0}")]
    Unsupported(#[from] UnsupportedEntry),

    #[error("Failed to start extraction sink `{sink}`: {source}")]
    SinkStart {
        sink: String,
        #[source]
        source: io::Error,
    },

    #[error("Extraction sink `{sink}` failed, Status: {status}, Output:\n{stderr}")]
    Sink {
        sink: String,
        status: String,
        stderr: String,
    },

    #[error("Extraction sink `{sink}` did not finish within {seconds}s")]
    Timeout { sink: String, seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Argument parsing error: {0}")]
    ArgumentParsing(String),
}

/// Entries that cannot be carried across the copy boundary as-is.
///
/// Raised as a warning: the entry is left out of the archive and the run
/// continues. Under `SpecialFilePolicy::Fail` a `SpecialFile` becomes fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedEntry {
    #[error("'{}' is a symlink to absolute path '{}'; only relative symlinks are supported", .path.display(), .target.display())]
    AbsoluteSymlink { path: PathBuf, target: PathBuf },

    #[error("'{}' is a {kind}, which cannot be copied", .path.display())]
    SpecialFile { path: PathBuf, kind: String },
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
