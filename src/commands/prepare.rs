use crate::core::candidate;
use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::core::ledger::SqlLedger;
use crate::commands::validate;
use log::debug;

/// Prepare the release candidate file
pub fn run_prepare(ctx: &ReleaseContext, force: bool) -> RampResult<()> {
  println!("📋 Preparing release candidate file");

  // Every model file must parse before a candidate is built
  validate::model_objects(&ctx.root, &ctx.config.project.model_dir)?;

  let (backend, applied_by) = ctx.backend()?;
  let ledger = SqlLedger::new(&backend, ctx.config.ledger.table.clone(), applied_by.clone());
  let target = ctx.target()?;

  let built = candidate::build_candidate(&ctx.repo, &backend, &ledger, &ctx.config, &target, force)?;
  debug!("Candidate token for branch {}: {}", built.branch, built.token);
  debug!("Release candidate file contents:\n{}", built.body);

  Ok(())
}
