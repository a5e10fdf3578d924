//! Change classification: one changed file in, one release entry out.
//!
//! The classifier decides whether a change can be auto-included in a release
//! or must be flagged for manual reconciliation. The match over change kinds
//! is exhaustive; a kind the engine does not understand is carried as
//! `Other` and always resolves to manual review. Whenever a change could fit
//! two dispositions, the conservative one wins.

use crate::core::candidate::{EntryTag, MARKER, PLACEHOLDER};
use crate::core::error::RampResult;
use crate::core::vcs::{Change, ChangeKind, SystemGit};
use crate::sql::{self, ObjectMetadata};
use crate::warehouse::{DbTarget, SqlBackend};
use log::warn;

/// Rendered disposition of one change
#[derive(Debug, Clone)]
pub struct ReleaseEntry {
  pub tag: EntryTag,
  /// Rationale lines rendered before the tag (as `--.` bookkeeping)
  pub lead: Vec<String>,
  /// Pre-rendered `--.DIFF:` lines following the tag
  pub diff: Vec<String>,
  /// Rationale lines rendered after the diff
  pub note: Vec<String>,
  /// Literal template lines the operator edits into real SQL
  pub statements: Vec<String>,
}

impl ReleaseEntry {
  /// Whether the operator must edit this entry before it can be deployed
  pub fn placeholder_required(&self) -> bool {
    self.statements.iter().any(|s| s.contains(PLACEHOLDER))
  }

  /// Render this entry as a candidate block
  pub fn render(&self) -> String {
    let mut out = String::new();
    for line in &self.lead {
      out.push_str(MARKER);
      out.push_str(line);
      out.push('\n');
    }
    out.push_str(&self.tag.render());
    out.push('\n');
    for line in &self.diff {
      out.push_str(line);
      out.push('\n');
    }
    for line in &self.note {
      out.push_str(MARKER);
      out.push_str(line);
      out.push('\n');
    }
    for line in &self.statements {
      out.push_str(line);
      out.push('\n');
    }
    out.push('\n');
    out
  }
}

fn entry(tag: EntryTag) -> ReleaseEntry {
  ReleaseEntry {
    tag,
    lead: Vec::new(),
    diff: Vec::new(),
    note: Vec::new(),
    statements: Vec::new(),
  }
}

fn included(change: &Change, pin: &str) -> EntryTag {
  EntryTag {
    kind: change.kind,
    included: true,
    path: change.path.clone(),
    pinned: Some(pin.to_string()),
  }
}

fn not_included(change: &Change) -> EntryTag {
  EntryTag {
    kind: change.kind,
    included: false,
    path: change.path.clone(),
    pinned: None,
  }
}

/// Classify one change against the base commit and the live catalog.
///
/// `pin` is the HEAD commit current at classification time; included entries
/// are bound to it so that later edits never change what a release executes.
pub fn classify(
  change: &Change,
  base_commit: &str,
  pin: &str,
  repo: &SystemGit,
  backend: &dyn SqlBackend,
  target: &DbTarget,
) -> RampResult<ReleaseEntry> {
  match change.kind {
    ChangeKind::Deleted => Ok(classify_deleted(change)),
    ChangeKind::Renamed => classify_renamed(change, base_commit, pin, repo),
    ChangeKind::Added => classify_added(change, pin, repo, backend, target),
    ChangeKind::Modified => classify_modified(change, base_commit, pin, repo),
    ChangeKind::Other(letter) => Ok(classify_other(change, letter)),
  }
}

fn classify_deleted(change: &Change) -> ReleaseEntry {
  let mut e = entry(not_included(change));
  e.lead = vec![
    "File was removed and will NOT be included in the release.".to_string(),
    "Provide an explicit DROP statement to keep the database state in sync:".to_string(),
  ];
  e.statements = vec![PLACEHOLDER.to_string()];
  e
}

fn classify_renamed(change: &Change, base_commit: &str, pin: &str, repo: &SystemGit) -> RampResult<ReleaseEntry> {
  let meta = ObjectMetadata::from_file(repo.work_tree(), &change.path)?;

  // The old object name comes from the old path's content at the base commit;
  // when that fails, fall back to a marker the operator must fill in.
  let old_name = change
    .old_path
    .as_deref()
    .and_then(|old| repo.show(base_commit, old).ok())
    .and_then(|text| ObjectMetadata::from_text(change.old_path.as_deref().unwrap_or_default(), &text).ok())
    .map(|old_meta| old_meta.name)
    .unwrap_or_else(|| "<<OLD_NAME>>".to_string());

  if meta.safe_ddl {
    let mut e = entry(included(change, pin));
    e.lead = vec![
      format!(
        "File with {} definition was renamed and will be included in the release.",
        meta.object_type
      ),
      "If the object itself was renamed, remember to drop the old one:".to_string(),
    ];
    e.statements = vec![format!("DROP {} {}; {}", meta.object_type, old_name, PLACEHOLDER)];
    Ok(e)
  } else {
    let mut e = entry(not_included(change));
    e.lead = vec![
      format!(
        "File with {} definition was renamed and will NOT be included in the release.",
        meta.object_type
      ),
      format!(
        "An ALTER {} RENAME may be needed to keep the database state in sync:",
        meta.object_type
      ),
    ];
    e.statements = vec![format!(
      "ALTER {} {} RENAME TO {}; {}",
      meta.object_type, old_name, meta.name, PLACEHOLDER
    )];
    Ok(e)
  }
}

fn classify_added(
  change: &Change,
  pin: &str,
  repo: &SystemGit,
  backend: &dyn SqlBackend,
  target: &DbTarget,
) -> RampResult<ReleaseEntry> {
  let meta = ObjectMetadata::from_file(repo.work_tree(), &change.path)?;

  if meta.safe_ddl {
    let mut e = entry(included(change, pin));
    e.lead = vec![
      "File was added and will be included in the release.".to_string(),
      "You can reorder the INCLUDED lines below.".to_string(),
    ];
    return Ok(e);
  }

  // Stateful object: first creation is safe, redefinition of a live one is not
  match backend.object_ddl(target, &meta.object_type, &meta.name)? {
    None => {
      let mut e = entry(included(change, pin));
      e.lead = vec![
        format!(
          "File with {} definition was added and {} does not exist in {}.",
          meta.object_type, meta.name, target.database
        ),
        "It will be included in the release.".to_string(),
        "You can reorder the INCLUDED lines below.".to_string(),
      ];
      Ok(e)
    }
    Some(live_ddl) => {
      warn!(
        "New CREATE {} definition found in {}, but {} already exists in {}.",
        meta.object_type, change.path, meta.name, target.database
      );

      let diff = sql::unified_diff(
        &live_ddl,
        &meta.text,
        &format!("{} {} definition in {}", meta.object_type, meta.name, target.database),
        &format!("{} {} from {}", meta.object_type, meta.name, change.path),
      );

      let mut e = entry(not_included(change));
      e.lead = vec![format!(
        "File with {} definition was added but {} already exists in {}.",
        meta.object_type, meta.name, target.database
      )];
      e.diff = comment_diff(&diff, None);
      e.note = vec![format!(
        "Double-check that the live {} definition matches the file contents.",
        meta.object_type
      )];
      e.statements = vec![format!(
        "SELECT '{} {} already exists in {}'; {}",
        meta.object_type, meta.name, target.database, PLACEHOLDER
      )];
      Ok(e)
    }
  }
}

fn classify_modified(change: &Change, base_commit: &str, pin: &str, repo: &SystemGit) -> RampResult<ReleaseEntry> {
  let meta = ObjectMetadata::from_file(repo.work_tree(), &change.path)?;

  if meta.safe_ddl {
    let mut e = entry(included(change, pin));
    e.lead = vec![
      "File was changed and will be included in the release.".to_string(),
      "You can reorder the INCLUDED lines below.".to_string(),
    ];
    return Ok(e);
  }

  let raw_diff = repo.file_diff(base_commit, &change.path)?;

  let mut e = entry(not_included(change));
  e.lead = vec!["File was changed but will NOT be included in the release.".to_string()];
  e.diff = comment_diff(&raw_diff, Some(&change.path));
  e.note = vec![format!(
    "An ALTER {} statement may be needed to keep the database state in sync:",
    meta.object_type
  )];
  if meta.object_type == "STREAM" {
    e.statements.push(format!(
      "SELECT 1/(CASE WHEN COUNT(*) > 0 THEN 0 ELSE 1 END) FROM {}; -- fails if the stream holds unconsumed rows",
      meta.name
    ));
  }
  e.statements
    .push(format!("ALTER {} {} {};", meta.object_type, meta.name, PLACEHOLDER));
  Ok(e)
}

fn classify_other(change: &Change, letter: char) -> ReleaseEntry {
  let mut e = entry(not_included(change));
  e.lead = vec![
    format!(
      "Change kind '{}' is not understood and will NOT be included in the release.",
      letter
    ),
    "Apply the change made in the file above manually:".to_string(),
  ];
  e.statements = vec![PLACEHOLDER.to_string()];
  e
}

/// Turn a diff into `--.DIFF:` bookkeeping lines, dropping git's file-header
/// noise (`index` lines and anything naming the file itself).
fn comment_diff(diff: &str, drop_containing: Option<&str>) -> Vec<String> {
  diff
    .lines()
    .filter(|line| !line.starts_with("index "))
    .filter(|line| match drop_containing {
      Some(path) => !line.contains(path),
      None => true,
    })
    .map(|line| format!("{}DIFF: {}", MARKER, line))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::testutil::GitFixture;
  use crate::warehouse::mock::MockWarehouse;

  fn dev_target() -> DbTarget {
    DbTarget {
      database: "_dev_feature_x".to_string(),
      is_production: false,
    }
  }

  fn change(kind: ChangeKind, path: &str) -> Change {
    Change {
      kind,
      path: path.to_string(),
      old_path: None,
    }
  }

  #[test]
  fn test_added_safe_ddl_is_always_included() {
    let fx = GitFixture::new();
    fx.write("model/views/orders_summary.sql", "CREATE OR REPLACE VIEW orders_summary AS SELECT 1;\n");
    let base = fx.commit_all("add view");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &change(ChangeKind::Added, "model/views/orders_summary.sql"),
      &base,
      &base,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(entry.tag.included);
    assert_eq!(entry.tag.pinned.as_deref(), Some(base.as_str()));
    assert!(!entry.placeholder_required());
  }

  #[test]
  fn test_modified_safe_ddl_is_always_included() {
    let fx = GitFixture::new();
    fx.write("model/procedures/refresh.sql", "CREATE OR REPLACE PROCEDURE refresh() AS 'SELECT 1';\n");
    let base = fx.commit_all("add proc");
    fx.write("model/procedures/refresh.sql", "CREATE OR REPLACE PROCEDURE refresh() AS 'SELECT 2';\n");
    let head = fx.commit_all("change proc");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &change(ChangeKind::Modified, "model/procedures/refresh.sql"),
      &base,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(entry.tag.included);
  }

  #[test]
  fn test_deleted_is_never_included_and_requires_placeholder() {
    let entry = classify_deleted(&change(ChangeKind::Deleted, "model/tables/gone.sql"));

    assert!(!entry.tag.included);
    assert!(entry.placeholder_required());
    assert!(entry.render().contains(PLACEHOLDER));
  }

  #[test]
  fn test_modified_table_gets_diff_and_alter_suggestion() {
    let fx = GitFixture::new();
    fx.write("model/tables/orders.sql", "CREATE TABLE IF NOT EXISTS orders (id INT);\n");
    let base = fx.commit_all("add table");
    fx.write(
      "model/tables/orders.sql",
      "CREATE TABLE IF NOT EXISTS orders (id INT, region TEXT);\n",
    );
    let head = fx.commit_all("widen table");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &change(ChangeKind::Modified, "model/tables/orders.sql"),
      &base,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(!entry.tag.included);
    assert!(!entry.diff.is_empty());
    assert!(entry.diff.iter().all(|l| l.starts_with("--.DIFF:")));
    let rendered = entry.render();
    assert!(rendered.contains("ALTER TABLE ORDERS"));
    assert!(entry.placeholder_required());
  }

  #[test]
  fn test_modified_stream_suggests_emptiness_probe() {
    let fx = GitFixture::new();
    fx.write(
      "model/streams/orders_changes.sql",
      "CREATE STREAM IF NOT EXISTS orders_changes ON TABLE orders;\n",
    );
    let base = fx.commit_all("add stream");
    fx.write(
      "model/streams/orders_changes.sql",
      "CREATE STREAM IF NOT EXISTS orders_changes ON TABLE orders_v2;\n",
    );
    let head = fx.commit_all("repoint stream");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &change(ChangeKind::Modified, "model/streams/orders_changes.sql"),
      &base,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    let rendered = entry.render();
    assert!(rendered.contains("1/(CASE WHEN COUNT(*) > 0"));
    assert!(rendered.contains("ALTER STREAM ORDERS_CHANGES"));
  }

  #[test]
  fn test_added_table_absent_from_catalog_is_included() {
    let fx = GitFixture::new();
    fx.write("model/tables/orders.sql", "CREATE TABLE IF NOT EXISTS orders (id INT);\n");
    let head = fx.commit_all("add table");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &change(ChangeKind::Added, "model/tables/orders.sql"),
      &head,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(entry.tag.included, "first creation of a table is safe to auto-include");
  }

  #[test]
  fn test_added_table_present_in_catalog_goes_to_manual_review() {
    let fx = GitFixture::new();
    fx.write("model/tables/orders.sql", "CREATE TABLE IF NOT EXISTS orders (id INT);\n");
    let head = fx.commit_all("add table");
    let repo = fx.repo();
    let backend = MockWarehouse::new().with_object("TABLE", "ORDERS", "CREATE TABLE ORDERS (\n  id INTEGER\n);");

    let entry = classify(
      &change(ChangeKind::Added, "model/tables/orders.sql"),
      &head,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(!entry.tag.included);
    assert!(!entry.diff.is_empty(), "live-vs-file diff must be rendered");
    assert!(entry.placeholder_required());
  }

  #[test]
  fn test_renamed_view_included_with_drop_reminder() {
    let fx = GitFixture::new();
    fx.write("model/views/old_name.sql", "CREATE OR REPLACE VIEW old_name AS SELECT 1;\n");
    let base = fx.commit_all("add view");
    fx.git(&["mv", "model/views/old_name.sql", "model/views/new_name.sql"]);
    fx.write("model/views/new_name.sql", "CREATE OR REPLACE VIEW new_name AS SELECT 1;\n");
    let head = fx.commit_all("rename view");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &Change {
        kind: ChangeKind::Renamed,
        path: "model/views/new_name.sql".to_string(),
        old_path: Some("model/views/old_name.sql".to_string()),
      },
      &base,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(entry.tag.included);
    assert!(entry.render().contains("DROP VIEW OLD_NAME;"));
  }

  #[test]
  fn test_renamed_table_goes_to_manual_review_with_rename_template() {
    let fx = GitFixture::new();
    fx.write("model/tables/old_orders.sql", "CREATE TABLE IF NOT EXISTS old_orders (id INT);\n");
    let base = fx.commit_all("add table");
    fx.git(&["mv", "model/tables/old_orders.sql", "model/tables/orders.sql"]);
    fx.write("model/tables/orders.sql", "CREATE TABLE IF NOT EXISTS orders (id INT);\n");
    let head = fx.commit_all("rename table");
    let repo = fx.repo();
    let backend = MockWarehouse::new();

    let entry = classify(
      &Change {
        kind: ChangeKind::Renamed,
        path: "model/tables/orders.sql".to_string(),
        old_path: Some("model/tables/old_orders.sql".to_string()),
      },
      &base,
      &head,
      &repo,
      &backend,
      &dev_target(),
    )
    .unwrap();

    assert!(!entry.tag.included);
    assert!(entry.render().contains("ALTER TABLE OLD_ORDERS RENAME TO ORDERS;"));
  }

  #[test]
  fn test_unknown_change_kind_is_manual_review() {
    let entry = classify_other(&change(ChangeKind::Other('T'), "model/views/v.sql"), 'T');
    assert!(!entry.tag.included);
    assert!(entry.render().contains("not understood"));
    assert!(entry.placeholder_required());
  }
}
