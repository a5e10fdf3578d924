//! CLI surface: exit codes and top-level diagnostics

use crate::helpers::{TestWorkspace, run_sqlramp};
use std::process::Command;

#[test]
fn missing_config_is_a_user_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().canonicalize().unwrap();
  crate::helpers::git(&path, &["init", "--initial-branch=main"]).unwrap();

  let bin = env!("CARGO_BIN_EXE_sqlramp");
  let output = Command::new(bin)
    .current_dir(&path)
    .args(["validate"])
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("No sqlramp configuration"));
}

#[test]
fn outside_a_repository_is_a_system_error() {
  let dir = tempfile::tempdir().unwrap();

  let bin = env!("CARGO_BIN_EXE_sqlramp");
  let output = Command::new(bin)
    .current_dir(dir.path())
    .args(["validate"])
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(2));
  assert!(String::from_utf8_lossy(&output.stderr).contains("repository"));
}

#[test]
fn unknown_action_fails() {
  let ws = TestWorkspace::new().unwrap();
  let output = run_sqlramp(&ws.path, &["frobnicate"]).unwrap();
  assert!(!output.status.success());
}

#[test]
fn help_lists_all_actions() {
  let ws = TestWorkspace::new().unwrap();
  let output = run_sqlramp(&ws.path, &["--help"]).unwrap();
  let stdout = String::from_utf8_lossy(&output.stdout);

  for action in [
    "prepare",
    "deploy",
    "migrate",
    "validate",
    "history",
    "clone",
    "sync",
    "test-sync",
    "compare",
    "diff",
    "list-stale-branches",
  ] {
    assert!(stdout.contains(action), "help must list {}: {}", action, stdout);
  }
}
