use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::warehouse::{SqlBackend, database_for_branch};
use std::collections::BTreeSet;

/// List development clones and whether a branch still backs them
pub fn run_list_stale_branches(ctx: &ReleaseContext) -> RampResult<()> {
  println!("🧹 Comparing active branches and development clones");

  let (backend, _) = ctx.backend()?;

  let branch_dbs: BTreeSet<String> = ctx
    .repo
    .branches()?
    .iter()
    .map(|branch| database_for_branch(&ctx.config.warehouse, branch).database)
    .collect();

  let clones = backend.list_dev_databases()?;

  println!("|{:_^32}|{:_^14}|", "clone", "has branch?");
  for clone in clones {
    println!(
      "| {:<30.30} | {:^12} |",
      clone,
      if branch_dbs.contains(&clone) { "yes" } else { "no" }
    );
  }
  Ok(())
}
