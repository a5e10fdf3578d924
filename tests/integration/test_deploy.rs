//! Deploy gates that fire before any warehouse access

use crate::helpers::{TestWorkspace, run_sqlramp};

#[test]
fn deploy_requires_a_candidate() {
  let ws = TestWorkspace::new().unwrap();

  let output = run_sqlramp(&ws.path, &["deploy"]).unwrap();
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("does not exist"), "diagnostic: {}", stderr);
  assert!(stderr.contains("prepare"), "help points at prepare: {}", stderr);
}

#[test]
fn deploy_refuses_unresolved_placeholder() {
  let ws = TestWorkspace::new().unwrap();
  ws.write(
    "releases/release_candidate.sql",
    "--.Release candidate file, branch: main\n\n\
     --.File was removed and will NOT be included in the release.\n\
     -- [D] NOT_INCLUDED:model/tables/gone.sql\n\
     <<HERE>>\n",
  )
  .unwrap();

  // --force acknowledges the missing token; the placeholder gate must still hold
  let output = run_sqlramp(&ws.path, &["deploy", "--force", "--dry-run"]).unwrap();
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("<<HERE>>"), "diagnostic names the placeholder: {}", stderr);

  // The candidate is left in place for the operator to finish editing
  assert!(ws.file_exists("releases/release_candidate.sql"));
}

#[test]
fn deploy_detects_tampered_candidate() {
  let ws = TestWorkspace::new().unwrap();
  ws.write("releases/release_candidate.sql", "--.Release candidate file, branch: main\n\nSELECT 1;\n")
    .unwrap();
  // A token file that cannot match the body
  ws.write("releases/release_candidate.sha", "0000000000000000").unwrap();

  let output = run_sqlramp(&ws.path, &["deploy", "--dry-run"]).unwrap();
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("was changed"), "tamper diagnostic: {}", stderr);
  assert!(stderr.contains("--force"), "help mentions the override: {}", stderr);
}
