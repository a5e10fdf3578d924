use crate::commands::history::tail;
use crate::commands::validate::model_objects;
use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::sql::{self, ObjectMetadata};
use crate::warehouse::SqlBackend;
use log::info;
use std::collections::BTreeSet;

const DIFF_DIR: &str = ".diff";
const MISSING: &str = "! MISSING !";

/// Compare warehouse and current branch definitions
pub fn run_compare(ctx: &ReleaseContext, file: Option<String>) -> RampResult<()> {
  println!("🔍 Comparing warehouse and git definitions");

  match file {
    Some(path) => compare_single_file(ctx, &path),
    None => compare_all(ctx),
  }
}

fn compare_all(ctx: &ReleaseContext) -> RampResult<()> {
  let git_objects = model_objects(&ctx.root, &ctx.config.project.model_dir)?;
  let (backend, _) = ctx.backend()?;
  let target = ctx.target()?;
  let live = backend.catalog(&target)?;

  println!(
    "| {:_^39} | {:_^11} | {:_^30} | {:_^16} |",
    "object name", "type", "GIT file name", "last change in DB"
  );

  let keys: BTreeSet<&String> = git_objects.keys().chain(live.keys()).collect();
  for key in keys {
    let name = git_objects
      .get(key)
      .map(|o| o.name.as_str())
      .or_else(|| live.get(key).map(|o| o.name.as_str()))
      .unwrap_or_default();
    let object_type = git_objects
      .get(key)
      .map(|o| o.object_type.as_str())
      .or_else(|| live.get(key).map(|o| o.object_type.as_str()))
      .unwrap_or_default();
    let file = git_objects.get(key).map(|o| tail(&o.file, 30).to_string());
    let altered = live
      .get(key)
      .and_then(|o| o.last_altered)
      .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string());

    println!(
      "| {:<39.39} | {:<11.11} | {:^30.30} | {:^16.16} |",
      name,
      object_type,
      file.as_deref().unwrap_or(MISSING),
      altered.as_deref().unwrap_or(MISSING),
    );
  }
  Ok(())
}

fn compare_single_file(ctx: &ReleaseContext, path: &str) -> RampResult<()> {
  if !sql::is_sql_file(path) {
    info!("{} is not a SQL file. Running global comparison.", path);
    return compare_all(ctx);
  }

  let meta = ObjectMetadata::from_file(&ctx.root, path)?;
  let (backend, _) = ctx.backend()?;
  let target = ctx.target()?;

  let Some(live_ddl) = backend.object_ddl(&target, &meta.object_type, &meta.name)? else {
    info!("{} {} does not exist in {}.", meta.object_type, meta.name, target.database);
    return Ok(());
  };

  // Keep a cleaned copy of the live definition next to the tree for diffing
  let diff_dir = ctx.root.join(DIFF_DIR);
  std::fs::create_dir_all(&diff_dir)?;
  let basename = std::path::Path::new(path)
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| "object.sql".to_string());
  let out_path = diff_dir.join(basename);
  std::fs::write(
    &out_path,
    format!("-- definition in {} --\n{}\n", target.database, sql::strip_comments(&live_ddl)),
  )?;
  info!("Live definition written to {}.", out_path.display());

  sql::print_sql(&meta.text);
  sql::print_sql(&live_ddl);
  Ok(())
}

/// Print the model-dir diff against the production branch
pub fn run_diff(ctx: &ReleaseContext) -> RampResult<()> {
  let diff = ctx.repo.diff_against_branch(
    &ctx.config.warehouse.production_branch,
    &ctx.config.project.model_dir,
  )?;
  println!("{}", diff);
  Ok(())
}
