//! # kp Docker Exec Sink
//!
//! File: cli/src/common/sink/docker.rs
//! Author: Christi Mahu
//!
//! Extracts the stream inside a Docker container through
//! `docker exec -i <container> tar xmf - -C <root> --no-same-owner`.
//! The container must be running and have `tar` on its `PATH`.
//!
use super::{tar_extract_args, ExtractionSink};
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerExecSink {
    docker_bin: String,
    container: String,
    extract_root: PathBuf,
}

impl DockerExecSink {
    pub fn new(
        docker_bin: impl Into<String>,
        container: impl Into<String>,
        extract_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            container: container.into(),
            extract_root: extract_root.into(),
        }
    }
}

impl ExtractionSink for DockerExecSink {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.docker_bin);
        command
            .arg("exec")
            .arg("-i")
            .arg(&self.container)
            .args(tar_extract_args(&self.extract_root));
        command
    }
}
