//! # kp Path Mapper
//!
//! File: cli/src/common/fs/mapper.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module computes *what* gets copied and *where it lands*. Given a local
//! source path and a destination directory inside the container, `map_paths`
//! produces a `TransferSet`: every filesystem object to transfer, paired with
//! its absolute path at the destination.
//!
//! ## Architecture
//!
//! - The source is `lstat`ed once. A missing source fails with
//!   `KpError::SourceNotFound` before anything is streamed.
//! - A non-directory source (regular file, symlink, device, ...) maps to a single
//!   entry `destination/<name>`.
//! - A directory source is walked with `walkdir`, lexically (symlinks are never
//!   followed, so a symlinked directory becomes one symlink entry). Each visited
//!   path `p` maps to `destination/<name>/<p relative to source>`, the source
//!   directory itself included.
//! - The walk is sorted by file name, giving a stable depth-first order.
//! - Any walk error aborts the whole mapping with `KpError::Traversal`.
//! - The `lstat` metadata seen during the walk is kept in each entry; the
//!   archiver builds headers from this snapshot instead of stat-ing again.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::mapper;
//! use std::path::Path;
//!
//! # fn run() -> crate::core::error::Result<()> {
//! let set = mapper::map_paths(Path::new("/tmp/a"), Path::new("/opt"))?;
//! for entry in &set {
//!     println!("{} -> {}", entry.source().display(), entry.archive_path().display());
//! }
//! // /tmp/a -> /opt/a
//! // /tmp/a/f.txt -> /opt/a/f.txt
//! // /tmp/a/sub -> /opt/a/sub
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{KpError, Result};
use anyhow::{anyhow, Context};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// The type of a source filesystem object, as seen by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    /// Anything else (FIFO, socket, device node), with a human readable name.
    Other(&'static str),
}

impl EntryKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other(describe_special(file_type))
        }
    }
}

#[cfg(unix)]
fn describe_special(file_type: fs::FileType) -> &'static str {
    use std::os::unix::fs::FileTypeExt;
    if file_type.is_fifo() {
        "FIFO"
    } else if file_type.is_socket() {
        "socket"
    } else if file_type.is_char_device() {
        "character device"
    } else if file_type.is_block_device() {
        "block device"
    } else {
        "special file"
    }
}

#[cfg(not(unix))]
fn describe_special(_file_type: fs::FileType) -> &'static str {
    "special file"
}

/// One source object and the absolute path it is copied to.
#[derive(Debug, Clone)]
pub struct TransferEntry {
    source: PathBuf,
    archive_path: PathBuf,
    kind: EntryKind,
    metadata: fs::Metadata,
}

impl TransferEntry {
    fn new(source: PathBuf, archive_path: PathBuf, metadata: fs::Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(metadata.file_type()),
            source,
            archive_path,
            metadata,
        }
    }

    /// Local path of the object to copy.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination path of the object inside the container.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// `lstat` snapshot taken while mapping.
    pub fn metadata(&self) -> &fs::Metadata {
        &self.metadata
    }

    /// Name of this entry inside the tar stream: the archive path relative to
    /// `root` (the directory the container-side `tar` extracts into), reduced to
    /// plain name components so it never starts with `/`.
    ///
    /// A relative archive path is taken as already relative to `root`. An
    /// absolute one must lie under `root`, otherwise `KpError::OutsideRoot` is
    /// returned. The result is empty when the entry *is* the root.
    pub fn entry_name(&self, root: &Path) -> Result<PathBuf> {
        let outside = || {
            anyhow!(KpError::OutsideRoot {
                path: self.archive_path.clone(),
                root: root.to_path_buf(),
            })
        };
        let relative = if self.archive_path.has_root() {
            self.archive_path
                .strip_prefix(root)
                .map_err(|_| outside())?
        } else {
            self.archive_path.as_path()
        };

        let mut name = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => name.push(part),
                Component::CurDir => {}
                // `..` would climb out of the extraction root.
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(outside())
                }
            }
        }
        Ok(name)
    }
}

/// The complete source-to-destination mapping for one copy operation.
///
/// Built once by `map_paths`, in walk order, with unique source paths.
#[derive(Debug, Clone, Default)]
pub struct TransferSet {
    entries: Vec<TransferEntry>,
}

impl TransferSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> std::slice::Iter<'_, TransferEntry> {
        self.entries.iter()
    }

    /// Looks up the entry for a given source path.
    #[cfg(test)]
    pub fn get(&self, source: &Path) -> Option<&TransferEntry> {
        self.entries.iter().find(|entry| entry.source == source)
    }
}

impl<'a> IntoIterator for &'a TransferSet {
    type Item = &'a TransferEntry;
    type IntoIter = std::slice::Iter<'a, TransferEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds the `TransferSet` for copying `source` into `destination_root`.
///
/// # Errors
///
/// * `KpError::SourceNotFound` - `source` cannot be `lstat`ed.
/// * `KpError::Traversal` - enumerating any directory below `source` failed.
#[instrument(level = "debug", skip_all, fields(source = %source.display(), destination = %destination_root.display()))]
pub fn map_paths(source: &Path, destination_root: &Path) -> Result<TransferSet> {
    let metadata = fs::symlink_metadata(source).map_err(|e| {
        anyhow!(KpError::SourceNotFound {
            path: source.to_path_buf(),
            source: e,
        })
    })?;

    // `.`, `..` and `/` have no name of their own: their contents go straight
    // into the destination.
    let target_base = match source.file_name() {
        Some(name) => destination_root.join(name),
        None => destination_root.to_path_buf(),
    };

    if !metadata.is_dir() {
        debug!("{} -> {}", source.display(), target_base.display());
        return Ok(TransferSet {
            entries: vec![TransferEntry::new(
                source.to_path_buf(),
                target_base,
                metadata,
            )],
        });
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let item = item.map_err(|e| traversal_error(source, e))?;
        let metadata = item.metadata().map_err(|e| traversal_error(source, e))?;
        let relative = item.path().strip_prefix(source).with_context(|| {
            format!(
                "Walked path {:?} is not below source {:?}",
                item.path(),
                source
            )
        })?;
        let archive_path = if relative.as_os_str().is_empty() {
            target_base.clone()
        } else {
            target_base.join(relative)
        };
        debug!("{} -> {}", item.path().display(), archive_path.display());
        entries.push(TransferEntry::new(item.into_path(), archive_path, metadata));
    }

    debug!("Mapped {} entries from {:?}", entries.len(), source);
    Ok(TransferSet { entries })
}

fn traversal_error(source: &Path, err: walkdir::Error) -> anyhow::Error {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.to_path_buf());
    anyhow!(KpError::Traversal { path, source: err })
}

/// Lexically normalises a path: drops `.` components, resolves `..` against
/// preceding names and collapses repeated separators. Symlinks are not
/// consulted. An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        PathBuf::from(".")
    } else {
        parts.iter().collect()
    }
}
