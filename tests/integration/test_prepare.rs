//! Prepare preconditions that fail before any warehouse access

use crate::helpers::{TestWorkspace, run_sqlramp};

#[test]
fn prepare_refuses_dirty_model_dir() {
  let ws = TestWorkspace::new().unwrap();
  ws.write(
    "model/views/orders_summary.sql",
    "CREATE OR REPLACE VIEW orders_summary AS SELECT 1;\n",
  )
  .unwrap();
  // Not committed: the model dir is dirty

  let output = run_sqlramp(&ws.path, &["prepare"]).unwrap();
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("not clean"), "diagnostic: {}", stderr);
}

#[test]
fn prepare_allows_dirt_outside_model_dir() {
  let ws = TestWorkspace::new().unwrap();
  ws.write("notes.txt", "scratch\n").unwrap();
  // Untracked file outside model/ is not a blocker; prepare proceeds to the
  // ledger lookup and fails there (no warehouse in this test), NOT on the tree.

  let output = run_sqlramp(&ws.path, &["prepare"]).unwrap();
  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(!stderr.contains("not clean"), "tree dirt outside model/ must not block: {}", stderr);
}

#[test]
fn prepare_validates_model_before_anything_else() {
  let ws = TestWorkspace::new().unwrap();
  ws.write("model/views/broken.sql", "SELECT 1;\n").unwrap();
  ws.commit("broken model").unwrap();

  let output = run_sqlramp(&ws.path, &["prepare"]).unwrap();
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("broken.sql"));
}
