//! # kp Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module implements the configuration system for kp: which executables to
//! use for the container runtimes, where the container-side `tar` extracts to,
//! how long a transfer may take, and what to do with special files.
//!
//! ## Architecture
//!
//! The configuration system follows these principles:
//! - Configuration is loaded from multiple sources in order of precedence
//! - Executable paths are expanded (e.g., `~` to home directory)
//! - Configuration is validated for correctness before use
//! - The loaded value is passed explicitly to the components that need it;
//!   nothing is stored in globals
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (applied by the copy command on top of the result)
//! 2. Project-specific `.kp.toml` in current directory or ancestors
//! 3. User-specific `<config dir>/kp/config.toml`
//! 4. Default values defined in the code
//!
//! ## Examples
//!
//! ```toml
//! [runtime]
//! docker = "~/bin/docker"
//!
//! [transfer]
//! extract_root = "/"
//! timeout_secs = 120
//! special_files = "fail"
//! ```
//!
//! ```rust
//! let cfg = config::load_config()?;
//! let sink = DockerExecSink::new(&cfg.runtime.docker, "web-1", &cfg.transfer.extract_root);
//! ```
//!
use crate::core::error::{KpError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)] // Error if unknown fields are in TOML
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Executables used to reach the container.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Docker CLI executable (name on PATH or path, can use ~).
    #[serde(default = "default_docker")]
    pub docker: String,
    /// kubectl executable (name on PATH or path, can use ~).
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
}

/// Settings for the transfer itself.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Directory inside the container that the archive is extracted into.
    /// Archive entry names are relative to it.
    #[serde(default = "default_extract_root")]
    pub extract_root: PathBuf,
    /// Deadline for the whole transfer, in seconds. No deadline when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// What to do with sockets, FIFOs and device nodes in the source tree.
    #[serde(default)]
    pub special_files: SpecialFilePolicy,
}

/// Handling of filesystem objects that are neither directories, regular
/// files nor symlinks.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpecialFilePolicy {
    /// Log a warning and leave the entry out of the archive.
    #[default]
    Skip,
    /// Abort the copy.
    Fail,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            kubectl: default_kubectl(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            extract_root: default_extract_root(),
            timeout_secs: None,
            special_files: SpecialFilePolicy::default(),
        }
    }
}

impl TransferConfig {
    /// The configured deadline, if any. A zero timeout means no deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_docker() -> String {
    "docker".to_string()
}
fn default_kubectl() -> String {
    "kubectl".to_string()
}
fn default_extract_root() -> PathBuf {
    PathBuf::from("/")
}

const PROJECT_CONFIG_FILENAME: &str = ".kp.toml";

/// Loads, merges, expands and validates the configuration.
pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "kp", "kp") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.kp.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

/// Walks up from `start` looking for `.kp.toml`, stopping at a `.git` boundary.
fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Project values win wherever they differ from the built-in defaults.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();
    let mut merged = user;

    if project_cfg.runtime.docker != defaults.runtime.docker {
        merged.runtime.docker = project_cfg.runtime.docker;
    }
    if project_cfg.runtime.kubectl != defaults.runtime.kubectl {
        merged.runtime.kubectl = project_cfg.runtime.kubectl;
    }
    if project_cfg.transfer.extract_root != defaults.transfer.extract_root {
        merged.transfer.extract_root = project_cfg.transfer.extract_root;
    }
    if project_cfg.transfer.timeout_secs.is_some() {
        merged.transfer.timeout_secs = project_cfg.transfer.timeout_secs;
    }
    if project_cfg.transfer.special_files != defaults.transfer.special_files {
        merged.transfer.special_files = project_cfg.transfer.special_files;
    }
    merged
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    config.runtime.docker = shellexpand::tilde(&config.runtime.docker).into_owned();
    config.runtime.kubectl = shellexpand::tilde(&config.runtime.kubectl).into_owned();
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.runtime.docker.trim().is_empty() {
        return Err(anyhow!(KpError::Config(
            "runtime.docker must not be empty".to_string()
        )));
    }
    if config.runtime.kubectl.trim().is_empty() {
        return Err(anyhow!(KpError::Config(
            "runtime.kubectl must not be empty".to_string()
        )));
    }
    if !config.transfer.extract_root.has_root() {
        return Err(anyhow!(KpError::Config(format!(
            "transfer.extract_root must be an absolute path, got '{}'",
            config.transfer.extract_root.display()
        ))));
    }
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_sections_missing() -> Result<()> {
        let cfg: Config = toml::from_str("")?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.runtime.docker, "docker");
        assert_eq!(cfg.runtime.kubectl, "kubectl");
        assert_eq!(cfg.transfer.extract_root, PathBuf::from("/"));
        assert_eq!(cfg.transfer.timeout(), None);
        assert_eq!(cfg.transfer.special_files, SpecialFilePolicy::Skip);
        Ok(())
    }

    #[test]
    fn test_parse_full_config() -> Result<()> {
        let cfg: Config = toml::from_str(
            r#"
            [runtime]
            docker = "/usr/local/bin/docker"
            kubectl = "k"

            [transfer]
            extract_root = "/srv"
            timeout_secs = 30
            special_files = "fail"
            "#,
        )?;
        assert_eq!(cfg.runtime.docker, "/usr/local/bin/docker");
        assert_eq!(cfg.runtime.kubectl, "k");
        assert_eq!(cfg.transfer.extract_root, PathBuf::from("/srv"));
        assert_eq!(cfg.transfer.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.transfer.special_files, SpecialFilePolicy::Fail);
        Ok(())
    }

    #[test]
    fn test_zero_timeout_means_no_deadline() {
        let transfer = TransferConfig {
            timeout_secs: Some(0),
            ..TransferConfig::default()
        };
        assert_eq!(transfer.timeout(), None);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[transfer]\ncompress = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_prefers_project_values() {
        let mut user = Config::default();
        user.runtime.docker = "/opt/docker".into();
        user.transfer.timeout_secs = Some(10);

        let mut project = Config::default();
        project.transfer.extract_root = "/data".into();
        project.transfer.special_files = SpecialFilePolicy::Fail;

        let merged = merge_configs(user, Some(project));
        assert_eq!(merged.runtime.docker, "/opt/docker");
        assert_eq!(merged.runtime.kubectl, "kubectl");
        assert_eq!(merged.transfer.extract_root, PathBuf::from("/data"));
        assert_eq!(merged.transfer.timeout_secs, Some(10));
        assert_eq!(merged.transfer.special_files, SpecialFilePolicy::Fail);
    }

    #[test]
    fn test_validate_rejects_relative_extract_root() {
        let mut cfg = Config::default();
        cfg.transfer.extract_root = "relative/dir".into();
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("must be an absolute path"));
    }

    #[test]
    fn test_validate_rejects_empty_executable() {
        let mut cfg = Config::default();
        cfg.runtime.kubectl = "  ".into();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_find_project_config_in_ancestor() -> Result<()> {
        let base = tempdir()?;
        fs::write(base.path().join(PROJECT_CONFIG_FILENAME), "")?;
        let nested = base.path().join("a/b");
        fs::create_dir_all(&nested)?;
        assert_eq!(
            find_project_config_path(&nested),
            Some(base.path().join(PROJECT_CONFIG_FILENAME))
        );
        Ok(())
    }

    #[test]
    fn test_find_project_config_stops_at_git() -> Result<()> {
        let base = tempdir()?;
        fs::write(base.path().join(PROJECT_CONFIG_FILENAME), "")?;
        let repo = base.path().join("repo");
        fs::create_dir_all(repo.join(".git"))?;
        assert_eq!(find_project_config_path(&repo), None);
        Ok(())
    }

    #[test]
    fn test_expand_leaves_plain_names() -> Result<()> {
        let mut cfg = Config::default();
        cfg.runtime.kubectl = "/usr/bin/kubectl".into();
        expand_config_paths(&mut cfg)?;
        assert_eq!(cfg.runtime.docker, "docker");
        assert_eq!(cfg.runtime.kubectl, "/usr/bin/kubectl");
        Ok(())
    }
}
