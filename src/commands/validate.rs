use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::sql::{self, ObjectMetadata};
use crate::warehouse::catalog_key;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

/// One object found in the model tree
#[derive(Debug, Clone)]
pub struct ModelObject {
  pub name: String,
  pub object_type: String,
  pub file: String,
}

/// Parse every SQL file under the model dir into object metadata.
///
/// Any unrecognizable file is a hard error, so a broken definition never
/// reaches classification.
pub fn model_objects(root: &Path, model_dir: &str) -> RampResult<BTreeMap<String, ModelObject>> {
  let mut objects = BTreeMap::new();
  let base = root.join(model_dir);
  if base.exists() {
    visit(root, &base, &mut objects)?;
  }
  Ok(objects)
}

fn visit(root: &Path, dir: &Path, objects: &mut BTreeMap<String, ModelObject>) -> RampResult<()> {
  let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
  entries.sort_by_key(|e| e.path());

  for entry in entries {
    let path = entry.path();
    if path.is_dir() {
      visit(root, &path, objects)?;
      continue;
    }
    let rel = path
      .strip_prefix(root)
      .map_err(|_| "model file outside the working tree")?
      .to_string_lossy()
      .to_string();
    if !sql::is_sql_file(&rel) {
      continue;
    }

    let meta = ObjectMetadata::from_file(root, &rel)?;
    objects.insert(
      catalog_key(&meta.object_type, &meta.name),
      ModelObject {
        name: meta.name,
        object_type: meta.object_type,
        file: rel,
      },
    );
  }
  Ok(())
}

/// Validate all model definitions
pub fn run_validate(ctx: &ReleaseContext) -> RampResult<()> {
  println!("🔎 Validating model definitions");
  let objects = model_objects(&ctx.root, &ctx.config.project.model_dir)?;
  info!("{} model definitions validated.", objects.len());
  Ok(())
}
