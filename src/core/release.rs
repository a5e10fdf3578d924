//! Release finalization: the candidate becomes an immutable, committed,
//! ledger-recorded release.
//!
//! Pinning is the critical correctness property here: every included entry is
//! expanded to the file content at the commit recorded when the entry was
//! classified, so edits between `prepare` and `deploy` can never change what
//! a release executes.

use crate::core::candidate::{CandidateDoc, CandidateLine, CandidateStore, PLACEHOLDER};
use crate::core::config::RampConfig;
use crate::core::error::{CandidateError, RampError, RampResult};
use crate::core::ledger::Ledger;
use crate::core::vcs::SystemGit;
use crate::warehouse::DbTarget;
use chrono::Utc;
use log::{info, warn};
use std::io::Write;

const RELEASE_COMMIT_MESSAGE: &str = "(sqlramp) new release";

/// A finalized release: the body that gets appended to the branch's release
/// file and later expanded for execution.
#[derive(Debug, Clone)]
pub struct Release {
  /// Repo-relative release file path, derived from the branch name
  pub filename: String,
  pub body: String,
}

/// Deterministic release file path for a branch
pub fn release_filename(releases_dir: &str, branch: &str) -> String {
  format!("{}/{}.sql", releases_dir, branch)
}

/// Validate the candidate and resolve it into a release body.
///
/// Fails when no candidate exists, when the integrity token does not verify
/// (unless the operator acknowledges their edit with `force`), and when any
/// manual-review placeholder survives.
pub fn finalize(repo: &SystemGit, config: &RampConfig, applied_by: &str, force: bool) -> RampResult<Release> {
  let branch = repo.file_safe_branch()?;
  let store = CandidateStore::new(repo.work_tree(), &config.project.releases_dir);
  let body = store.load()?;

  if force {
    match store.is_modified(&branch) {
      Ok(true) => warn!("Deploying an edited release candidate due to --force."),
      Ok(false) => {}
      Err(e) => warn!("Candidate token could not be checked ({}); continuing due to --force.", e),
    }
  } else {
    store.verify(&branch)?;
  }

  if body.contains(PLACEHOLDER) {
    return Err(RampError::Candidate(CandidateError::PlaceholderFound {
      placeholder: PLACEHOLDER.to_string(),
    }));
  }

  let doc = CandidateDoc::parse(&body);
  let included = doc.tags().filter(|tag| tag.included).count();
  info!("Finalizing {} included definition(s).", included);

  let mut out = format!(
    "\n-- RELEASE FROM BRANCH {}\n-- {} on {}\n\n",
    branch,
    applied_by,
    Utc::now().format("%Y-%m-%d %H:%M")
  );

  for line in &doc.lines {
    match line {
      CandidateLine::Marker(_) => {}
      CandidateLine::Tag(tag) => {
        out.push_str(&tag.render());
        out.push('\n');
        if tag.included {
          let pin = pinned_commit(tag)?;
          let commit = repo.last_commit_info(&tag.path)?;
          out.push_str(&format!(
            "-- change on:   {} by {}: {}\n",
            commit.date, commit.author, commit.subject
          ));
          out.push_str(&format!("-- show file:   git show {}:{}\n", pin, tag.path));
        }
      }
      CandidateLine::Comment(text) | CandidateLine::Literal(text) => {
        out.push_str(text);
        out.push('\n');
      }
    }
  }

  Ok(Release {
    filename: release_filename(&config.project.releases_dir, &branch),
    body: out,
  })
}

/// Expand a release body into executable SQL.
///
/// Included tags expand to the pinned file content; literal statements pass
/// through; bookkeeping and plain comments are dropped (the statement
/// splitter strips remaining comments anyway).
pub fn release_to_sql(body: &str, repo: &SystemGit) -> RampResult<String> {
  let doc = CandidateDoc::parse(body);
  let mut sql = String::new();

  for line in &doc.lines {
    match line {
      CandidateLine::Tag(tag) => {
        sql.push_str(&tag.render());
        sql.push('\n');
        if tag.included {
          let pin = pinned_commit(tag)?;
          let content = repo.show(pin, &tag.path)?;
          sql.push_str(&content);
          if !content.ends_with('\n') {
            sql.push('\n');
          }
        }
      }
      CandidateLine::Literal(text) => {
        sql.push_str(text);
        sql.push('\n');
      }
      CandidateLine::Marker(_) | CandidateLine::Comment(_) => {}
    }
  }

  Ok(sql)
}

fn pinned_commit(tag: &crate::core::candidate::EntryTag) -> RampResult<&str> {
  tag.pinned.as_deref().ok_or_else(|| {
    RampError::with_help(
      format!("INCLUDED entry for {} has no pinned commit.", tag.path),
      "Re-create the candidate with `sqlramp prepare --force`.",
    )
  })
}

/// Persist an executed release: append the body to the branch's release file,
/// commit and push it, record the ledger row, and drop the candidate.
///
/// The three completion steps are not atomic. When the ledger insert fails
/// after the commit, the desync is surfaced for manual correction instead of
/// being retried: a blind retry risks double-applying non-idempotent SQL.
pub fn save_release(
  repo: &SystemGit,
  config: &RampConfig,
  ledger: &dyn Ledger,
  target: &DbTarget,
  release: &Release,
  branch: &str,
) -> RampResult<()> {
  let abs = repo.work_tree().join(&release.filename);
  if let Some(parent) = abs.parent() {
    std::fs::create_dir_all(parent)?;
  }

  info!("Writing to {}.", release.filename);
  let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&abs)?;
  file.write_all(release.body.as_bytes())?;

  repo.commit_and_push(&release.filename, RELEASE_COMMIT_MESSAGE)?;

  let commit = repo.last_commit_hash(&release.filename)?;
  if let Err(e) = ledger.insert(target, &release.filename, &commit, branch) {
    return Err(RampError::with_help(
      format!(
        "Release {} was committed but its ledger row could not be inserted: {}",
        release.filename, e
      ),
      "The ledger is now behind the committed history. Insert the row manually before the next \
       sync; retrying blindly risks double-applying non-idempotent statements.",
    ));
  }

  let store = CandidateStore::new(repo.work_tree(), &config.project.releases_dir);
  match store.is_modified(branch) {
    Ok(true) => warn!("Removing modified release candidate file."),
    _ => info!("Removing release candidate file."),
  }
  store.remove()?;

  Ok(())
}
