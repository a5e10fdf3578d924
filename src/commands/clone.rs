use crate::core::context::ReleaseContext;
use crate::core::error::{RampError, RampResult, WarehouseError};
use crate::warehouse::SqlBackend;
use dialoguer::Confirm;
use log::info;
use regex::Regex;
use std::sync::LazyLock;

static VALID_DB_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap());

/// Clone production into the branch database
pub fn run_clone(ctx: &ReleaseContext, force: bool) -> RampResult<()> {
  println!("🧬 Cloning production database");

  let (backend, _) = ctx.backend()?;
  let target = ctx.target()?;
  let new_db = &target.database;
  let production = &ctx.config.warehouse.production_db;

  if !VALID_DB_NAME.is_match(new_db) {
    return Err(RampError::message(format!(
      "{} is not a valid database identifier",
      new_db
    )));
  }
  if new_db == production {
    return Err(RampError::Warehouse(WarehouseError::Protected {
      database: production.clone(),
    }));
  }
  if new_db == &ctx.config.warehouse.staging_db && !force {
    return Err(RampError::with_help(
      format!("Trying to recreate {} without --force.", new_db),
      "Re-run with --force to replace the staging database.",
    ));
  }

  info!("Checking if {} already exists...", new_db);
  let exists = backend.database_exists(new_db)?;
  if exists && !force {
    let replace = Confirm::new()
      .with_prompt(format!("{} already exists. Are you sure you want to replace it?", new_db))
      .default(false)
      .interact()
      .map_err(|e| RampError::message(format!("Prompt failed: {}", e)))?;
    if !replace {
      return Ok(());
    }
  }
  if exists {
    backend.drop_database(new_db)?;
  }

  backend.clone_database(production, new_db)?;
  info!("Cloning finished");
  Ok(())
}
