//! Sync engine: replay committed releases the ledger has not seen yet.
//!
//! The ledger's base commit divides already-applied from pending history;
//! everything under the releases directory that changed since it is replayed
//! in ascending commit order. A removed release file carries no executable
//! intent and is skipped with a warning.

use crate::core::config::RampConfig;
use crate::core::error::{RampResult, ResultExt};
use crate::core::ledger::Ledger;
use crate::core::release;
use crate::core::vcs::{Change, ChangeKind, SystemGit};
use crate::sql;
use crate::warehouse::{DbTarget, SqlBackend, database_for_branch};
use log::{info, warn};

/// Committed release files not yet reflected in the ledger watermark
pub fn unsynced_releases(repo: &SystemGit, base_commit: &str, releases_dir: &str) -> RampResult<Vec<Change>> {
  Ok(
    repo
      .changed_files(base_commit, releases_dir)?
      .into_iter()
      .filter(|change| sql::is_sql_file(&change.path))
      .filter(|change| !change.path.ends_with("release_candidate.sql"))
      .collect(),
  )
}

/// Replay pending releases against the target database.
///
/// `dry_run` renders the SQL of the first pending file and then exits the
/// whole loop: previewing part of a backlog and claiming completeness would
/// be worse than stopping early.
pub fn sync_releases(
  repo: &SystemGit,
  backend: &dyn SqlBackend,
  ledger: &dyn Ledger,
  config: &RampConfig,
  target: &DbTarget,
  branch: &str,
  dry_run: bool,
) -> RampResult<()> {
  let base_commit = ledger.base_commit(target)?;
  let mut files = unsynced_releases(repo, &base_commit, &config.project.releases_dir)?;

  // Ascending commit order: oldest release file first
  let order = repo.path_commit_order(&base_commit, &config.project.releases_dir)?;
  files.sort_by_key(|change| order.get(&change.path).copied().unwrap_or(0));

  if files.is_empty() {
    info!("No pending changes to sync.");
    return Ok(());
  }
  warn!("Syncing changes:");

  for change in files {
    if change.kind == ChangeKind::Deleted {
      warn!("Skipping removed release file {}.", change.path);
      continue;
    }

    info!("Running release file {}:", change.path);

    let body = std::fs::read_to_string(repo.work_tree().join(&change.path))
      .with_context(|| format!("Failed to read release file {}", change.path))?;
    let deploy_sql = release::release_to_sql(&body, repo)?;

    if log::log_enabled!(log::Level::Debug) {
      sql::print_sql(&deploy_sql);
    }
    if dry_run {
      if !log::log_enabled!(log::Level::Debug) {
        sql::print_sql(&deploy_sql);
      }
      info!("Skipping SQL execution due to --dry-run.");
      return Ok(());
    }

    backend.perform_release(&deploy_sql, target)?;

    let commit = repo.last_commit_hash(&change.path)?;
    ledger.insert(target, &change.path, &commit, branch)?;
  }

  Ok(())
}

/// Replay pending releases against a throwaway clone of production, then
/// drop the clone whether or not the replay succeeded.
pub fn test_sync(
  repo: &SystemGit,
  backend: &dyn SqlBackend,
  ledger: &dyn Ledger,
  config: &RampConfig,
) -> RampResult<()> {
  let head = repo.head_commit()?;
  let target = database_for_branch(&config.warehouse, &head);

  info!("Cloning {} into {}", config.warehouse.production_db, target.database);
  backend.clone_database(&config.warehouse.production_db, &target.database)?;

  let result = sync_releases(repo, backend, ledger, config, &target, &head, false);

  info!("Dropping clone {}", target.database);
  let dropped = backend.drop_database(&target.database);

  result?;
  dropped
}
