//! Unified release context - build once, pass everywhere
//!
//! One CLI invocation performs one logical action; the context carries the
//! collaborators that action needs (repository handle, project config) and
//! constructs the warehouse backend on demand, so read-only actions like
//! `validate` never touch connection settings.

use crate::core::config::{RampConfig, UserConfig};
use crate::core::error::RampResult;
use crate::core::vcs::SystemGit;
use crate::warehouse::{DbTarget, database_for_branch};
use crate::warehouse::postgres::PgWarehouse;
use std::path::{Path, PathBuf};

/// Per-invocation context shared by all commands
pub struct ReleaseContext {
  /// Working tree root (absolute path)
  pub root: PathBuf,

  /// Project configuration (sqlramp.toml at the tree root)
  pub config: RampConfig,

  /// Git boundary
  pub repo: SystemGit,
}

impl ReleaseContext {
  /// Build the context from the invocation directory.
  ///
  /// Opens the enclosing git repository and loads sqlramp.toml from its root.
  pub fn build(cwd: &Path) -> RampResult<Self> {
    let repo = SystemGit::open(cwd)?;
    let root = repo.work_tree().to_path_buf();
    let config = RampConfig::load(&root)?;

    Ok(Self { root, config, repo })
  }

  /// Raw branch name (drives the branch→database mapping)
  pub fn branch(&self) -> RampResult<String> {
    self.repo.current_branch()
  }

  /// Database this invocation operates on
  pub fn target(&self) -> RampResult<DbTarget> {
    Ok(database_for_branch(&self.config.warehouse, &self.branch()?))
  }

  /// Construct the warehouse backend from the user's connection file.
  ///
  /// Returns the backend together with the identity recorded in ledger rows.
  pub fn backend(&self) -> RampResult<(PgWarehouse, String)> {
    let user = UserConfig::load()?;
    let applied_by = user.connection.user.clone();
    Ok((PgWarehouse::new(user.connection), applied_by))
  }
}
