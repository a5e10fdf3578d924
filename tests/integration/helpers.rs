//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A test repository with sqlramp configuration and git history
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a new test repository with config, model dir, and user config
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().canonicalize()?;

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(
      path.join("sqlramp.toml"),
      r#"[project]
model_dir = "model"
releases_dir = "releases"

[warehouse]
production_db = "dwh"
staging_db = "dwh_staging"

[ledger]
table = "public.release_ledger"
"#,
    )?;

    // Connection file the binary picks up via SQLRAMP_USER_CONFIG
    std::fs::write(
      path.join("user.toml"),
      r#"[connection]
user = "test"
host = "localhost"
port = 5432
"#,
    )?;

    std::fs::create_dir_all(path.join("model"))?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial workspace setup"])?;

    Ok(Self { _root: root, path })
  }

  /// Write a file (creating parent directories)
  pub fn write(&self, rel: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(rel);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
  }

  /// Commit current changes and return the new HEAD sha
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "-A"])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the sqlramp CLI; returns the raw output without asserting success
pub fn run_sqlramp(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_sqlramp");

  Command::new(bin)
    .current_dir(cwd)
    .env("SQLRAMP_USER_CONFIG", cwd.join("user.toml"))
    .args(args)
    .output()
    .context("Failed to run sqlramp")
}

/// Run the sqlramp CLI and require a zero exit status
pub fn run_sqlramp_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_sqlramp(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "sqlramp command failed: sqlramp {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
