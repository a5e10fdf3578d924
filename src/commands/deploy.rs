use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::core::ledger::SqlLedger;
use crate::core::release;
use crate::sql;
use crate::warehouse::SqlBackend;
use log::info;

/// Deploy the release candidate: finalize, execute, record
pub fn run_deploy(ctx: &ReleaseContext, dry_run: bool, force: bool) -> RampResult<()> {
  println!("🚀 Deploying release candidate");

  let (backend, applied_by) = ctx.backend()?;
  let ledger = SqlLedger::new(&backend, ctx.config.ledger.table.clone(), applied_by.clone());
  let target = ctx.target()?;
  let branch = ctx.repo.file_safe_branch()?;

  let release = release::finalize(&ctx.repo, &ctx.config, &applied_by, force)?;
  let deploy_sql = release::release_to_sql(&release.body, &ctx.repo)?;

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

  backend.perform_release(&deploy_sql, &target)?;
  release::save_release(&ctx.repo, &ctx.config, &ledger, &target, &release, &branch)?;

  Ok(())
}
