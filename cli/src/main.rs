//! # kp Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This file serves as the main entry point for the kp CLI application.
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Running the copy and reporting its errors
//!
//! ## Architecture
//!
//! kp has a single operation, so there are no subcommands: the copy arguments
//! (`commands::copy::CopyArgs`) are flattened into the top-level `Cli`.
//! All errors are propagated to this level, printed with their full context
//! chain, and turned into exit status 1.
//!
//! ## Examples
//!
//! ```bash
//! # Copy a directory into a Docker container
//! kp -c web-1 ./dist /srv/www
//!
//! # Copy a file into a pod's container, with debug logging
//! kp -vv -p api-7d9f -n staging -c app ./config.yaml /etc/app
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Run the copy
//! 4. Format and display any errors that occur
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

// Declare the top-level modules of the CLI crate.
mod commands; // The copy command
mod common; // Path mapper, archiver, sinks and the streaming pipeline
mod core; // Core infrastructure (errors, config)

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "kp",
    about = "Copy files and directories into a running container (almost) natively",
    long_about = "Copy a local file or directory into a running Docker container or Kubernetes pod.\n\
                  The source is streamed as a tar archive into `tar` running inside the container,\n\
                  so nothing needs to be installed there besides tar itself.",
    version
)]
struct Cli {
    #[command(flatten)]
    copy: commands::copy::CopyArgs,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = commands::copy::handle_copy(cli.copy).await {
        tracing::error!("Copy failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
