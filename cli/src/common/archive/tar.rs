//! # kp Streaming TAR Archiver (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module serializes a `TransferSet` into a tar stream, entry by entry, into
//! any `std::io::Write`. Nothing is buffered whole: file contents are copied from
//! an open handle straight into the writer, so the archive can be piped into the
//! container-side `tar` while it is still being produced.
//!
//! ## Architecture
//!
//! The module uses the `tar` crate's `Builder` with GNU headers (long names are
//! emitted as GNU extension records). For each entry, in mapping order:
//!
//! - **Directory**: a directory header, no body. The extraction root itself
//!   (an empty entry name) is not emitted.
//! - **Regular file**: a header built from the `lstat` snapshot taken while
//!   mapping, followed by exactly `size` bytes read from the file. A file that
//!   shrank in the meantime fails the archive.
//! - **Symlink**: relative targets get a symlink header. Absolute targets would
//!   point somewhere else inside the container, so they are skipped and recorded.
//! - **Anything else** (FIFO, socket, device): skipped or fatal, depending on
//!   `SpecialFilePolicy`.
//!
//! Entry names are the destination paths made relative to the extraction root
//! (`ArchiveOptions::root`), which is the directory passed to `tar -C` on the
//! container side.
//!
//! Any failure stops the archive immediately. The builder would normally write the
//! end-of-archive trailer when dropped; the output is poisoned first so a failed
//! stream never looks complete to the reader.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::tar::{ArchiveOptions, Archiver};
//! use crate::common::fs::mapper;
//! use std::path::Path;
//!
//! # fn run() -> crate::core::error::Result<()> {
//! let set = mapper::map_paths(Path::new("/tmp/a"), Path::new("/opt"))?;
//! let archiver = Archiver::new(ArchiveOptions::default());
//! let mut bytes = Vec::new();
//! let summary = archiver.write_archive(&mut bytes, &set)?;
//! println!("{} files, {} bytes of content", summary.files, summary.bytes);
//! # Ok(())
//! # }
//! ```
//!
use crate::common::fs::mapper::{EntryKind, TransferEntry, TransferSet};
use crate::core::config::SpecialFilePolicy;
use crate::core::error::{KpError, Result, UnsupportedEntry};
use anyhow::anyhow;
use std::{
    fs::File,
    io::{self, Read, Write},
    path::PathBuf,
};
use tar::{Builder, Header, HeaderMode};
use tracing::{debug, info, warn};

/// Settings for one archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Directory the stream is extracted into; entry names are relative to it.
    pub root: PathBuf,
    /// What to do with FIFOs, sockets and device nodes.
    pub special_files: SpecialFilePolicy,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            special_files: SpecialFilePolicy::default(),
        }
    }
}

/// What a finished archive contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub directories: usize,
    pub files: usize,
    pub symlinks: usize,
    /// Total bytes of file content written (headers and padding excluded).
    pub bytes: u64,
    /// Entries left out of the stream, in mapping order.
    pub skipped: Vec<UnsupportedEntry>,
}

/// Writes `TransferSet`s as tar streams.
#[derive(Debug, Clone)]
pub struct Archiver {
    options: ArchiveOptions,
}

impl Archiver {
    pub fn new(options: ArchiveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// # Write Archive (`write_archive`)
    ///
    /// Streams every entry of `set` into `out` as a tar archive and finishes it
    /// with the end-of-archive trailer.
    ///
    /// ## Arguments
    ///
    /// * `out` - The destination writer. It is consumed and dropped before this
    ///   function returns, on success and on failure alike, so a pipe reader on
    ///   the other end sees end-of-stream exactly once.
    /// * `set` - The mapping produced by `mapper::map_paths`.
    ///
    /// ## Returns
    ///
    /// * `Result<ArchiveSummary>` - Counts of what was written and the list of
    ///   skipped entries.
    ///
    /// ## Errors
    ///
    /// * `KpError::Io` - a source could not be opened or read, a file shrank after
    ///   mapping, or writing to `out` failed. The path is the source path.
    /// * `KpError::OutsideRoot` - a destination does not lie under the root.
    /// * `KpError::Unsupported` - a special file under `SpecialFilePolicy::Fail`.
    pub fn write_archive<W: Write>(&self, out: W, set: &TransferSet) -> Result<ArchiveSummary> {
        let mut builder = Builder::new(PoisonableWriter::new(out));
        let mut summary = ArchiveSummary::default();

        for entry in set {
            if let Err(e) = self.append_entry(&mut builder, entry, &mut summary) {
                builder.get_mut().poison();
                return Err(e);
            }
        }

        let finished = builder
            .into_inner()
            .and_then(|mut writer| writer.flush())
            .map_err(|e| {
                anyhow!(KpError::Io {
                    path: self.options.root.clone(),
                    source: e,
                })
            });
        finished?;

        info!(
            "Archived {} directories, {} files ({} bytes), {} symlinks; skipped {}",
            summary.directories,
            summary.files,
            summary.bytes,
            summary.symlinks,
            summary.skipped.len()
        );
        Ok(summary)
    }

    fn append_entry<W: Write>(
        &self,
        builder: &mut Builder<W>,
        entry: &TransferEntry,
        summary: &mut ArchiveSummary,
    ) -> Result<()> {
        let name = entry.entry_name(&self.options.root)?;
        let io_error = |source: io::Error| {
            anyhow!(KpError::Io {
                path: entry.source().to_path_buf(),
                source,
            })
        };

        if name.as_os_str().is_empty() {
            if entry.kind() == EntryKind::Directory {
                // The root already exists on the other side.
                debug!("Skipping extraction root entry for {:?}", entry.source());
                return Ok(());
            }
            return Err(anyhow!(KpError::OutsideRoot {
                path: entry.archive_path().to_path_buf(),
                root: self.options.root.clone(),
            }));
        }

        match entry.kind() {
            EntryKind::Directory => {
                let mut header = header_for(entry);
                builder
                    .append_data(&mut header, &name, io::empty())
                    .map_err(io_error)?;
                summary.directories += 1;
            }
            EntryKind::File => {
                let file = File::open(entry.source()).map_err(io_error)?;
                let size = entry.metadata().len();
                let mut header = header_for(entry);
                builder
                    .append_data(&mut header, &name, ExactReader::new(file, size))
                    .map_err(io_error)?;
                summary.files += 1;
                summary.bytes += size;
            }
            EntryKind::Symlink => {
                let target = std::fs::read_link(entry.source()).map_err(io_error)?;
                if target.has_root() {
                    let warning = UnsupportedEntry::AbsoluteSymlink {
                        path: entry.source().to_path_buf(),
                        target,
                    };
                    warn!("Skipping: {}", warning);
                    summary.skipped.push(warning);
                    return Ok(());
                }
                let mut header = header_for(entry);
                builder
                    .append_link(&mut header, &name, &target)
                    .map_err(io_error)?;
                summary.symlinks += 1;
            }
            EntryKind::Other(kind) => {
                let unsupported = UnsupportedEntry::SpecialFile {
                    path: entry.source().to_path_buf(),
                    kind: kind.to_string(),
                };
                match self.options.special_files {
                    SpecialFilePolicy::Fail => {
                        return Err(anyhow!(KpError::Unsupported(unsupported)))
                    }
                    SpecialFilePolicy::Skip => {
                        warn!("Skipping: {}", unsupported);
                        summary.skipped.push(unsupported);
                        return Ok(());
                    }
                }
            }
        }

        debug!("Archived {:?} as {:?}", entry.source(), name);
        Ok(())
    }
}

/// Header filled from the mapping-time `lstat` snapshot: type, mode, owner,
/// mtime and (for regular files) size.
fn header_for(entry: &TransferEntry) -> Header {
    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(entry.metadata(), HeaderMode::Complete);
    header
}

/// Reads exactly `remaining` bytes from `inner`.
///
/// Ends early with `UnexpectedEof` if `inner` runs dry first; bytes past
/// `remaining` are never read.
struct ExactReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> ExactReader<R> {
    fn new(inner: R, remaining: u64) -> Self {
        Self { inner, remaining }
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let read = self.inner.read(&mut buf[..limit])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file shrank while copying, {} bytes missing", self.remaining),
            ));
        }
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// Output wrapper that can be switched off.
///
/// Once poisoned, writes and flushes fail, which keeps `Builder`'s drop from
/// appending a trailer to an aborted stream.
struct PoisonableWriter<W> {
    inner: W,
    poisoned: bool,
}

impl<W: Write> PoisonableWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            poisoned: false,
        }
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }

    fn check(&self) -> io::Result<()> {
        if self.poisoned {
            Err(io::Error::new(io::ErrorKind::Other, "archive aborted"))
        } else {
            Ok(())
        }
    }
}

impl<W: Write> Write for PoisonableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}
