use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::core::ledger::SqlLedger;
use crate::core::sync as engine;

/// Replay committed releases the ledger has not seen yet
pub fn run_sync(ctx: &ReleaseContext, dry_run: bool) -> RampResult<()> {
  println!("🔁 Syncing unapplied releases");

  let (backend, applied_by) = ctx.backend()?;
  let ledger = SqlLedger::new(&backend, ctx.config.ledger.table.clone(), applied_by.clone());
  let target = ctx.target()?;
  let branch = ctx.repo.file_safe_branch()?;

  engine::sync_releases(&ctx.repo, &backend, &ledger, &ctx.config, &target, &branch, dry_run)
}

/// Replay pending releases on a throwaway clone of production
pub fn run_test_sync(ctx: &ReleaseContext) -> RampResult<()> {
  println!("🧪 Test-syncing releases on a production clone");

  let (backend, applied_by) = ctx.backend()?;
  let ledger = SqlLedger::new(&backend, ctx.config.ledger.table.clone(), applied_by.clone());

  engine::test_sync(&ctx.repo, &backend, &ledger, &ctx.config)
}
