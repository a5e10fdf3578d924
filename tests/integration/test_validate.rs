//! Validation of model definitions through the CLI

use crate::helpers::{TestWorkspace, run_sqlramp, run_sqlramp_ok};

#[test]
fn validate_accepts_well_formed_model_tree() {
  let ws = TestWorkspace::new().unwrap();
  ws.write(
    "model/views/orders_summary.sql",
    "CREATE OR REPLACE VIEW orders_summary AS SELECT 1;\n",
  )
  .unwrap();
  ws.write(
    "model/tables/orders.sql",
    "CREATE TABLE IF NOT EXISTS orders (id INT);\n",
  )
  .unwrap();
  ws.commit("add model").unwrap();

  run_sqlramp_ok(&ws.path, &["validate"]).unwrap();
}

#[test]
fn validate_rejects_file_without_create_statement() {
  let ws = TestWorkspace::new().unwrap();
  ws.write("model/views/broken.sql", "SELECT 1;\n").unwrap();
  ws.commit("add broken file").unwrap();

  let output = run_sqlramp(&ws.path, &["validate"]).unwrap();
  assert_eq!(output.status.code(), Some(3), "bad SQL object is a validation failure");
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("CREATE"), "diagnostic names the problem: {}", stderr);
  assert!(stderr.contains("broken.sql"), "diagnostic names the file: {}", stderr);
}

#[test]
fn validate_rejects_or_replace_on_a_table() {
  let ws = TestWorkspace::new().unwrap();
  ws.write(
    "model/tables/orders.sql",
    "CREATE OR REPLACE TABLE orders (id INT);\n",
  )
  .unwrap();
  ws.commit("dangerous table").unwrap();

  let output = run_sqlramp(&ws.path, &["validate"]).unwrap();
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("OR REPLACE"));
}

#[test]
fn validate_passes_on_empty_model_dir() {
  let ws = TestWorkspace::new().unwrap();
  run_sqlramp_ok(&ws.path, &["validate"]).unwrap();
}
