//! [`TestWorld`]: an isolated workspace directory plus a thin wrapper for
//! driving the `mnemo` binary against it, the way `agtrace-testing`'s
//! `TestWorld` drives `agtrace`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use tempfile::TempDir;

/// Outcome of a single `mnemo` invocation.
pub struct CliResult {
    pub status_success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status_success
    }
}

/// An isolated `--data-dir` plus the `mnemo` binary, for black-box CLI
/// integration tests. Each `TestWorld` gets its own temp directory, so
/// parallel tests never share a SQLite file.
pub struct TestWorld {
    temp_dir: TempDir,
    data_dir: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let data_dir = temp_dir.path().join("workspace");
        Self { temp_dir, data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a file under the workspace root, creating parent directories
    /// as needed, and returns its path.
    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Runs `mnemo --data-dir <workspace> <args>`, capturing the result
    /// without panicking on a non-zero exit (use `.success()` to assert).
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("mnemo")?;
        cmd.arg("--data-dir").arg(&self.data_dir);
        cmd.args(args);
        let output = cmd.output()?;
        Ok(CliResult {
            status_success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
