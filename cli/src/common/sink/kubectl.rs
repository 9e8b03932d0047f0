//! # kp Kubectl Exec Sink
//!
//! File: cli/src/common/sink/kubectl.rs
//! Author: Christi Mahu
//!
//! Extracts the stream inside a Kubernetes pod through
//! `kubectl exec <pod> [--namespace <ns>] [-c <container>] -i -- tar xmf - -C <root> --no-same-owner`.
//!
//! Without a namespace kubectl uses the one of the current context; without a
//! container it picks the pod's default container.
//!
use super::{tar_extract_args, ExtractionSink};
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlExecSink {
    kubectl_bin: String,
    pod: String,
    container: Option<String>,
    namespace: Option<String>,
    extract_root: PathBuf,
}

impl KubectlExecSink {
    pub fn new(
        kubectl_bin: impl Into<String>,
        pod: impl Into<String>,
        extract_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kubectl_bin: kubectl_bin.into(),
            pod: pod.into(),
            container: None,
            namespace: None,
            extract_root: extract_root.into(),
        }
    }

    /// Targets a specific container of the pod.
    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }
}

impl ExtractionSink for KubectlExecSink {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.kubectl_bin);
        command.arg("exec").arg(&self.pod);
        if let Some(namespace) = &self.namespace {
            command.arg("--namespace").arg(namespace);
        }
        if let Some(container) = &self.container {
            command.arg("-c").arg(container);
        }
        command
            .arg("-i")
            .arg("--")
            .args(tar_extract_args(&self.extract_root));
        command
    }
}
