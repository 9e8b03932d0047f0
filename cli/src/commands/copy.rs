//! # kp Copy Command
//!
//! File: cli/src/commands/copy.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module implements the one thing `kp` does: copy a local file or
//! directory into a running container.
//!
//! ```bash
//! # Docker: copy ./dist into /srv/www of container `web-1`
//! kp -c web-1 ./dist /srv/www
//!
//! # Kubernetes: copy config.yaml into /etc/app of pod `api-7d9f`, container `app`
//! kp -p api-7d9f -n staging -c app ./config.yaml /etc/app
//! ```
//!
//! ## Architecture
//!
//! `handle_copy` glues the pieces together:
//! 1. Loads the configuration and applies the command-line overrides.
//! 2. Selects the extraction sink: a pod selects `kubectl exec`, otherwise a
//!    container selects `docker exec`.
//! 3. Maps the (lexically cleaned) source onto the destination.
//! 4. Streams the archive into the sink and reports what was copied.
//!
use crate::common::archive::tar::{ArchiveOptions, Archiver};
use crate::common::fs::mapper::{self, clean_path};
use crate::common::process::stream_to_sink;
use crate::common::sink::{docker::DockerExecSink, kubectl::KubectlExecSink, ExtractionSink};
use crate::core::config::{self, Config, SpecialFilePolicy};
use crate::core::error::{KpError, Result};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// # Copy Arguments (`CopyArgs`)
///
/// Where to copy from, where to copy to, and which container receives it.
#[derive(Parser, Debug, Clone)]
pub struct CopyArgs {
    /// Container ID or name (Docker), or container within the pod (Kubernetes).
    #[arg(short, long)]
    pub container: Option<String>,

    /// Pod name. Selects `kubectl exec` instead of `docker exec`.
    #[arg(short, long)]
    pub pod: Option<String>,

    /// Kubernetes namespace of the pod.
    #[arg(short, long, env = "KP_NAMESPACE")]
    pub namespace: Option<String>,

    /// Abort the transfer after this many seconds (0 disables the deadline).
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Fail on FIFOs, sockets and device files instead of skipping them.
    #[arg(long)]
    pub strict: bool,

    /// Local file or directory to copy.
    pub source: PathBuf,

    /// Directory inside the container to copy into.
    pub destination: PathBuf,
}

/// # Handle Copy Command (`handle_copy`)
///
/// Entry point for `kp`. Loads configuration and runs the copy.
pub async fn handle_copy(args: CopyArgs) -> Result<()> {
    let config = config::load_config()?;
    run_copy(args, config).await
}

/// Runs a copy with an already loaded configuration.
pub async fn run_copy(args: CopyArgs, mut config: Config) -> Result<()> {
    apply_overrides(&args, &mut config);
    let sink = select_sink(&args, &config)?;

    let source = clean_path(&args.source);
    let destination = clean_path(&args.destination);
    info!(
        "Copying '{}' to '{}' via `{}`",
        source.display(),
        destination.display(),
        sink.describe()
    );

    let set = mapper::map_paths(&source, &destination).with_context(|| {
        format!(
            "Failed to list files to copy from '{}' to '{}'",
            source.display(),
            destination.display()
        )
    })?;

    let archiver = Archiver::new(ArchiveOptions {
        root: config.transfer.extract_root.clone(),
        special_files: config.transfer.special_files,
    });
    let report = stream_to_sink(sink.as_ref(), set, archiver, config.transfer.timeout())
        .await
        .with_context(|| {
            format!(
                "Failed to copy '{}' to '{}' using `{}`",
                source.display(),
                destination.display(),
                sink.describe()
            )
        })?;

    if !report.stdout.is_empty() {
        debug!("Sink stdout:\n{}", report.stdout);
    }
    if !report.stderr.is_empty() {
        debug!("Sink stderr:\n{}", report.stderr);
    }

    let summary = &report.summary;
    println!(
        "Copied {} files ({} bytes), {} directories and {} symlinks to '{}'",
        summary.files,
        summary.bytes,
        summary.directories,
        summary.symlinks,
        destination.display()
    );
    if !summary.skipped.is_empty() {
        eprintln!("Skipped {} entries:", summary.skipped.len());
        for skipped in &summary.skipped {
            eprintln!("- {}", skipped);
        }
    }
    Ok(())
}

/// Command-line flags win over file configuration.
fn apply_overrides(args: &CopyArgs, config: &mut Config) {
    if let Some(timeout) = args.timeout {
        config.transfer.timeout_secs = Some(timeout);
    }
    if args.strict {
        config.transfer.special_files = SpecialFilePolicy::Fail;
    }
}

/// Picks the extraction sink for the given target.
///
/// A pod selects Kubernetes (with `--container` naming the container inside
/// it); otherwise a container is required and Docker is used.
pub fn select_sink(args: &CopyArgs, config: &Config) -> Result<Box<dyn ExtractionSink>> {
    let root = config.transfer.extract_root.clone();
    match (&args.pod, &args.container) {
        (Some(pod), container) => Ok(Box::new(
            KubectlExecSink::new(config.runtime.kubectl.clone(), pod.clone(), root)
                .with_container(container.clone())
                .with_namespace(args.namespace.clone()),
        )),
        (None, Some(container)) => {
            if let Some(namespace) = &args.namespace {
                warn!(
                    "Ignoring namespace '{}': namespaces only apply to pods",
                    namespace
                );
            }
            Ok(Box::new(DockerExecSink::new(
                config.runtime.docker.clone(),
                container.clone(),
                root,
            )))
        }
        (None, None) => Err(anyhow!(KpError::ArgumentParsing(
            "Please provide at least a container ID or a pod name".to_string()
        ))),
    }
}
