//! # kp Copy Integration Tests
//!
//! File: cli/tests/copy.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Runs the `kp` binary end to end. No container runtime is needed: where a
//! transfer actually happens, `runtime.docker` points at a small script that
//! drops the `exec -i <container>` prefix and runs the container-side `tar`
//! command locally.
//!

mod common;
use common::isolated_kp_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_requires_container_or_pod() {
    let work = tempdir().unwrap();
    isolated_kp_cmd(work.path())
        .args(["./src", "/opt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Please provide at least a container ID or a pod name",
        ));
}

#[test]
fn test_missing_source_fails() {
    let work = tempdir().unwrap();
    let missing = work.path().join("does-not-exist");
    isolated_kp_cmd(work.path())
        .arg("-c")
        .arg("web-1")
        .arg(&missing)
        .arg("/opt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list files to copy"))
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_relative_extract_root_is_rejected() {
    let work = tempdir().unwrap();
    fs::write(
        work.path().join(".kp.toml"),
        "[transfer]\nextract_root = \"relative/root\"\n",
    )
    .unwrap();
    fs::write(work.path().join("file.txt"), "x").unwrap();

    isolated_kp_cmd(work.path())
        .args(["-c", "web-1", "file.txt", "/opt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("extract_root must be an absolute path"));
}

#[test]
fn test_unknown_config_field_is_rejected() {
    let work = tempdir().unwrap();
    fs::write(work.path().join(".kp.toml"), "[transfer]\ncompress = true\n").unwrap();

    isolated_kp_cmd(work.path())
        .args(["-c", "web-1", "file.txt", "/opt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse TOML"));
}

#[cfg(unix)]
mod end_to_end {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Writes a fake `docker` that runs the exec'd command on the host.
    fn fake_docker(dir: &Path, body: &str) -> PathBuf {
        let script = dir.join("fake-docker");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn write_project_config(work: &Path, docker: &Path, root: &Path) {
        fs::write(
            work.join(".kp.toml"),
            format!(
                "[runtime]\ndocker = \"{}\"\n\n[transfer]\nextract_root = \"{}\"\n",
                docker.display(),
                root.display()
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_copies_directory_into_destination() {
        let work = tempdir().unwrap();
        let root = work.path().join("container-root");
        fs::create_dir_all(&root).unwrap();
        let src = work.path().join("a");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("f.txt"), "hello").unwrap();
        fs::write(src.join("sub/g.txt"), "nested").unwrap();
        std::os::unix::fs::symlink("f.txt", src.join("link")).unwrap();

        // Arguments are `exec -i <container> tar ...`.
        let docker = fake_docker(work.path(), "shift 3\nexec \"$@\"");
        write_project_config(work.path(), &docker, &root);

        isolated_kp_cmd(work.path())
            .arg("-c")
            .arg("web-1")
            .arg("a")
            .arg(root.join("opt"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Copied 2 files"));

        let copied = root.join("opt/a");
        assert_eq!(fs::read_to_string(copied.join("f.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(copied.join("sub/g.txt")).unwrap(), "nested");
        assert_eq!(
            fs::read_link(copied.join("link")).unwrap(),
            PathBuf::from("f.txt")
        );
    }

    #[test]
    fn test_sink_failure_is_reported_with_stderr() {
        let work = tempdir().unwrap();
        let root = work.path().join("container-root");
        fs::create_dir_all(&root).unwrap();
        fs::write(work.path().join("f.txt"), "hello").unwrap();

        let docker = fake_docker(
            work.path(),
            "cat >/dev/null\necho \"Error: No such container: $3\" >&2\nexit 1",
        );
        write_project_config(work.path(), &docker, &root);

        isolated_kp_cmd(work.path())
            .args(["-c", "ghost", "f.txt"])
            .arg(root.join("opt"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("No such container: ghost"))
            .stderr(predicate::str::contains("exec -i ghost tar xmf -"));
    }
}
