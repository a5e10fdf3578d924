//! Shared fixtures for unit tests: throwaway git repositories and configs.

use crate::core::config::{LedgerConfig, ProjectConfig, RampConfig, WarehouseConfig};
use crate::core::vcs::SystemGit;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway git repository with helpers for writing and committing files
pub struct GitFixture {
  _dir: TempDir,
  pub root: PathBuf,
}

impl GitFixture {
  pub fn new() -> Self {
    let dir = TempDir::new().expect("create tempdir");
    let root = dir.path().canonicalize().expect("canonicalize tempdir");

    run_git(&root, &["init", "--initial-branch=main"]);
    run_git(&root, &["config", "user.name", "Test User"]);
    run_git(&root, &["config", "user.email", "test@example.com"]);

    Self { _dir: dir, root }
  }

  pub fn git(&self, args: &[&str]) -> String {
    run_git(&self.root, args)
  }

  pub fn write(&self, rel: &str, content: &str) {
    let path = self.root.join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, content).expect("write file");
  }

  pub fn remove(&self, rel: &str) {
    std::fs::remove_file(self.root.join(rel)).expect("remove file");
  }

  /// Stage everything and commit; returns the new HEAD sha
  pub fn commit_all(&self, message: &str) -> String {
    self.git(&["add", "-A"]);
    self.git(&["commit", "-m", message]);
    self.head()
  }

  pub fn head(&self) -> String {
    self.git(&["rev-parse", "HEAD"]).trim().to_string()
  }

  pub fn repo(&self) -> SystemGit {
    SystemGit::open(&self.root).expect("open fixture repo")
  }
}

/// Default project config used across core tests
pub fn test_config() -> RampConfig {
  RampConfig {
    project: ProjectConfig::default(),
    warehouse: WarehouseConfig {
      production_db: "dwh".to_string(),
      staging_db: "dwh_staging".to_string(),
      production_branch: "main".to_string(),
      staging_branch: "develop".to_string(),
    },
    ledger: LedgerConfig::default(),
  }
}

fn run_git(cwd: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .expect("run git");
  assert!(
    output.status.success(),
    "git {:?} failed: {}",
    args,
    String::from_utf8_lossy(&output.stderr)
  );
  String::from_utf8_lossy(&output.stdout).to_string()
}
