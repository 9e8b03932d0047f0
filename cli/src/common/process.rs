//! # kp Sink Pipeline (`common::process`)
//!
//! File: cli/src/common/process.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module runs one copy end to end: it starts an extraction sink, streams
//! the archive of a `TransferSet` into the sink's stdin while the archive is
//! being produced, and collects whatever the sink prints. The sink's output
//! channels are drained while it runs, never after it exits, so a chatty sink
//! cannot stall the transfer by filling its stdout or stderr pipe.
//!
//! ## Architecture
//!
//! Four tasks run next to the sink process:
//!
//! ```text
//!   producer (blocking)          pump (async)               sink process
//!   Archiver::write_archive ---> mpsc channel ---> stdin  [ tar xmf - ... ]
//!                                                  stdout ---> drain task
//!                                                  stderr ---> drain task
//! ```
//!
//! - **Producer**: runs the synchronous archiver on the blocking pool, writing
//!   into a `PipeWriter` that hands chunks to a bounded channel. When the channel
//!   is full the producer waits, which is the backpressure of the pipe.
//! - **Pump**: copies chunks into the sink's stdin and closes it once the
//!   producer is done. Closing stdin is how the sink learns the archive ended,
//!   including when the producer stopped early because of an error.
//! - **Drains**: read stdout and stderr to the end.
//!
//! If the sink stops reading, the pump fails and drops the channel receiver; the
//! producer's next write then fails with `BrokenPipe` and it stops too.
//!
//! Result precedence once everything finished:
//! 1. Sink failed, producer failed for a reason other than `BrokenPipe`: the
//!    producer error (the sink most likely failed because the stream was cut).
//! 2. Sink failed otherwise: `KpError::Sink` with the captured stderr.
//! 3. Sink succeeded but the producer or pump failed: that error.
//! 4. Otherwise a `CopyReport`.
//!
//! An optional deadline bounds the whole transfer. When it elapses the sink is
//! killed, the helper tasks are aborted and `KpError::Timeout` is returned.
//!
use crate::common::archive::tar::{ArchiveSummary, Archiver};
use crate::common::fs::mapper::TransferSet;
use crate::common::sink::ExtractionSink;
use crate::core::error::{KpError, Result};
use anyhow::{anyhow, Context};
use std::{
    io::{self, BufWriter, Write},
    process::ExitStatus,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdin},
    sync::mpsc,
    task::{self, JoinHandle},
    time,
};
use tracing::{debug, error, info, instrument, warn};

/// Size of one chunk handed from the producer to the pump.
const CHUNK_SIZE: usize = 64 * 1024;
/// Chunks the pipe holds before the producer has to wait.
const PIPE_DEPTH: usize = 16;

/// Outcome of a successful copy.
#[derive(Debug, Clone, Default)]
pub struct CopyReport {
    pub summary: ArchiveSummary,
    /// Everything the sink wrote to stdout.
    pub stdout: String,
    /// Everything the sink wrote to stderr. Usually empty on success.
    pub stderr: String,
}

/// # Stream To Sink (`stream_to_sink`)
///
/// Archives `set` with `archiver` and extracts it through `sink`.
///
/// ## Arguments
///
/// * `sink` - The extraction sink to start.
/// * `set` - The mapping to transfer. Consumed: it is moved into the producer.
/// * `archiver` - Archive settings (extraction root, special-file policy).
/// * `deadline` - Optional upper bound for the whole transfer.
///
/// ## Returns
///
/// * `Result<CopyReport>` - The archive summary and the sink's output.
///
/// ## Errors
///
/// * `KpError::SinkStart` - the sink could not be spawned.
/// * `KpError::Sink` - the sink exited unsuccessfully.
/// * `KpError::Timeout` - the deadline elapsed.
/// * Any archiver error (`KpError::Io`, `KpError::OutsideRoot`, ...).
#[instrument(level = "info", skip_all, fields(sink = %sink.describe(), entries = set.len()))]
pub async fn stream_to_sink(
    sink: &dyn ExtractionSink,
    set: TransferSet,
    archiver: Archiver,
    deadline: Option<Duration>,
) -> Result<CopyReport> {
    let description = sink.describe();
    info!(
        "Streaming {} entries (extraction root {:?})",
        set.len(),
        archiver.options().root
    );

    let mut child = sink.start()?;
    let stdin = take_stream(child.stdin.take(), "stdin", &description)?;
    let stdout = take_stream(child.stdout.take(), "stdout", &description)?;
    let stderr = take_stream(child.stderr.take(), "stderr", &description)?;

    let (tx, rx) = mpsc::channel(PIPE_DEPTH);
    let mut tasks = PipelineTasks {
        producer: task::spawn_blocking(move || {
            let writer = BufWriter::with_capacity(CHUNK_SIZE, PipeWriter { tx });
            archiver.write_archive(writer, &set)
        }),
        pump: task::spawn(pump(rx, stdin)),
        stdout: task::spawn(drain(stdout)),
        stderr: task::spawn(drain(stderr)),
    };

    let finished = match deadline {
        Some(limit) => match time::timeout(limit, finish(&mut child, &mut tasks)).await {
            Ok(finished) => finished,
            Err(_) => {
                error!("Transfer did not finish within {:?}, killing the sink", limit);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill extraction sink: {}", e);
                }
                tasks.abort().await;
                return Err(anyhow!(KpError::Timeout {
                    sink: description,
                    seconds: limit.as_secs(),
                }));
            }
        },
        None => finish(&mut child, &mut tasks).await,
    };

    let Finished {
        status,
        produced,
        pumped,
        stdout,
        stderr,
    } = finished.with_context(|| format!("Failed to run extraction sink `{}`", description))?;
    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        if let Err(e) = produced {
            if !is_broken_pipe(&e) {
                return Err(e);
            }
        }
        let status = status
            .code()
            .map_or_else(|| status.to_string(), |code| code.to_string());
        error!("Extraction sink exited with status {}", status);
        return Err(anyhow!(KpError::Sink {
            sink: description,
            status,
            stderr,
        }));
    }

    let summary = match produced {
        Ok(summary) => summary,
        Err(e) if is_broken_pipe(&e) => {
            return Err(e.context(format!(
                "Extraction sink `{}` exited before reading the whole archive",
                description
            )))
        }
        Err(e) => return Err(e),
    };
    let written = pumped.with_context(|| {
        format!("Failed to write the archive to extraction sink `{}`", description)
    })?;

    info!("Transferred {} archive bytes", written);
    Ok(CopyReport {
        summary,
        stdout,
        stderr,
    })
}

/// Handles of the helper tasks of one transfer.
struct PipelineTasks {
    producer: JoinHandle<Result<ArchiveSummary>>,
    pump: JoinHandle<io::Result<u64>>,
    stdout: JoinHandle<io::Result<Vec<u8>>>,
    stderr: JoinHandle<io::Result<Vec<u8>>>,
}

impl PipelineTasks {
    /// Stops the async tasks and waits for the producer to notice.
    ///
    /// Blocking tasks cannot be aborted; aborting the pump drops the channel
    /// receiver, which makes the producer's next write fail.
    async fn abort(self) {
        self.pump.abort();
        self.stdout.abort();
        self.stderr.abort();
        match self.producer.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Producer stopped after abort: {:#}", e),
            Err(e) => debug!("Producer task ended abnormally: {}", e),
        }
    }
}

/// Everything collected from a transfer that ran to the end.
struct Finished {
    status: ExitStatus,
    produced: Result<ArchiveSummary>,
    pumped: io::Result<u64>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

async fn finish(child: &mut Child, tasks: &mut PipelineTasks) -> Result<Finished> {
    let status = child
        .wait()
        .await
        .context("Failed to wait for the extraction sink to exit")?;
    debug!("Extraction sink exited: {}", status);

    let produced = match (&mut tasks.producer).await {
        Ok(result) => result,
        Err(e) => Err(anyhow!("Archive producer task failed: {}", e)),
    };
    let pumped = (&mut tasks.pump)
        .await
        .context("Archive pump task failed")?;
    let stdout = (&mut tasks.stdout)
        .await
        .context("Stdout drain task failed")?
        .context("Failed to read extraction sink stdout")?;
    let stderr = (&mut tasks.stderr)
        .await
        .context("Stderr drain task failed")?
        .context("Failed to read extraction sink stderr")?;

    Ok(Finished {
        status,
        produced,
        pumped,
        stdout,
        stderr,
    })
}

fn take_stream<T>(stream: Option<T>, name: &str, sink: &str) -> Result<T> {
    stream.ok_or_else(|| anyhow!("Extraction sink `{}` was started without a piped {}", sink, name))
}

/// Write half of the in-process pipe between producer and pump.
struct PipeWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx.blocking_send(buf.to_vec()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "extraction sink stopped reading the archive",
            )
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Copies chunks into the sink's stdin until the producer hangs up, then closes it.
async fn pump(mut rx: mpsc::Receiver<Vec<u8>>, mut stdin: ChildStdin) -> io::Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = stdin.write_all(&chunk).await {
            debug!("Writing to sink stdin failed after {} bytes: {}", written, e);
            return Err(e);
        }
        written += chunk.len() as u64;
    }
    stdin.shutdown().await?;
    debug!("Sink stdin closed after {} bytes", written);
    Ok(written)
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    reader.read_to_end(&mut output).await?;
    Ok(output)
}

/// True if the error chain bottoms out in a `BrokenPipe` I/O error.
fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}
