//! Release candidate: wire format, integrity token, and builder.
//!
//! The candidate file is the reviewable intermediate artifact between
//! `prepare` and `deploy`. Its on-disk format is line-oriented text for
//! operator editing, but it is parsed into a typed model immediately on read;
//! raw text never travels between the classifier and the finalizer.
//!
//! A sha256 token over body+branch binds the candidate to the content and
//! branch it was generated from. Any out-of-band edit or branch switch breaks
//! the token; `deploy` refuses a broken token unless the operator explicitly
//! acknowledges the edit with --force.

use crate::core::classify::{self, ReleaseEntry};
use crate::core::config::RampConfig;
use crate::core::error::{CandidateError, GitError, RampError, RampResult, ResultExt};
use crate::core::ledger::Ledger;
use crate::core::sync;
use crate::core::vcs::{ChangeKind, SystemGit};
use crate::sql;
use crate::warehouse::{DbTarget, SqlBackend};
use log::{debug, info, warn};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Reserved comment marker for bookkeeping lines (stripped at finalize)
pub const MARKER: &str = "--.";

/// Manual-review placeholder; deploy refuses a candidate still carrying one
pub const PLACEHOLDER: &str = "<<HERE>>";

const CANDIDATE_FILE: &str = "release_candidate.sql";
const TOKEN_FILE: &str = "release_candidate.sha";

static ENTRY_TAG: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^-- \[(?P<kind>.)\] (?P<inc>(?:NOT_)?INCLUDED):(?P<path>\S+)( #(?P<pin>[0-9a-fA-F]+))?\s*$").unwrap()
});

/// The machine-parsable line describing one entry's disposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTag {
  pub kind: ChangeKind,
  pub included: bool,
  pub path: String,
  /// Commit the entry's content is pinned to (included entries only)
  pub pinned: Option<String>,
}

impl EntryTag {
  pub fn render(&self) -> String {
    let disposition = if self.included { "INCLUDED" } else { "NOT_INCLUDED" };
    match &self.pinned {
      Some(pin) => format!("-- [{}] {}:{} #{}", self.kind.letter(), disposition, self.path, pin),
      None => format!("-- [{}] {}:{}", self.kind.letter(), disposition, self.path),
    }
  }

  pub fn parse(line: &str) -> Option<EntryTag> {
    let caps = ENTRY_TAG.captures(line)?;
    Some(EntryTag {
      kind: ChangeKind::from_status(&caps["kind"]),
      included: &caps["inc"] == "INCLUDED",
      path: caps["path"].to_string(),
      pinned: caps.name("pin").map(|m| m.as_str().to_string()),
    })
  }
}

/// One parsed line of a candidate or release body
#[derive(Debug, Clone)]
pub enum CandidateLine {
  /// `--.` bookkeeping, dropped at finalize
  Marker(String),
  /// Entry tag line
  Tag(EntryTag),
  /// Plain `--` comment, kept verbatim
  Comment(String),
  /// Literal SQL (or operator-supplied text)
  Literal(String),
}

/// Typed view of a candidate or release body
#[derive(Debug, Clone)]
pub struct CandidateDoc {
  pub lines: Vec<CandidateLine>,
}

impl CandidateDoc {
  pub fn parse(text: &str) -> CandidateDoc {
    let lines = text
      .lines()
      .map(|line| {
        if let Some(tag) = EntryTag::parse(line) {
          CandidateLine::Tag(tag)
        } else if line.starts_with(MARKER) {
          CandidateLine::Marker(line.to_string())
        } else if line.starts_with("--") {
          CandidateLine::Comment(line.to_string())
        } else {
          CandidateLine::Literal(line.to_string())
        }
      })
      .collect();
    CandidateDoc { lines }
  }

  /// Entry tags in order
  pub fn tags(&self) -> impl Iterator<Item = &EntryTag> {
    self.lines.iter().filter_map(|line| match line {
      CandidateLine::Tag(tag) => Some(tag),
      _ => None,
    })
  }
}

/// A built release candidate
#[derive(Debug, Clone)]
pub struct ReleaseCandidate {
  pub body: String,
  pub branch: String,
  pub token: String,
}

/// Compute the integrity token binding a body to its branch
pub fn integrity_token(body: &str, branch: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(body.as_bytes());
  hasher.update(branch.as_bytes());
  format!("{:x}", hasher.finalize())
}

/// On-disk home of the candidate and its token
pub struct CandidateStore {
  candidate_path: PathBuf,
  token_path: PathBuf,
}

impl CandidateStore {
  pub fn new(work_tree: &std::path::Path, releases_dir: &str) -> Self {
    let dir = work_tree.join(releases_dir);
    Self {
      candidate_path: dir.join(CANDIDATE_FILE),
      token_path: dir.join(TOKEN_FILE),
    }
  }

  pub fn candidate_path(&self) -> &std::path::Path {
    &self.candidate_path
  }

  pub fn exists(&self) -> bool {
    self.candidate_path.exists()
  }

  /// Persist the body and its integrity token
  pub fn save(&self, body: &str, branch: &str) -> RampResult<String> {
    if let Some(parent) = self.candidate_path.parent() {
      fs::create_dir_all(parent)?;
    }
    let token = integrity_token(body, branch);
    fs::write(&self.candidate_path, body)
      .with_context(|| format!("Failed to write {}", self.candidate_path.display()))?;
    fs::write(&self.token_path, &token).with_context(|| format!("Failed to write {}", self.token_path.display()))?;
    Ok(token)
  }

  pub fn load(&self) -> RampResult<String> {
    if !self.exists() {
      return Err(RampError::Candidate(CandidateError::Missing {
        path: self.candidate_path.clone(),
      }));
    }
    Ok(fs::read_to_string(&self.candidate_path)?)
  }

  /// Whether the on-disk body+branch still matches the stored token
  pub fn is_modified(&self, branch: &str) -> RampResult<bool> {
    if !self.token_path.exists() {
      return Err(RampError::Candidate(CandidateError::TokenMissing {
        path: self.candidate_path.clone(),
      }));
    }
    let body = self.load()?;
    let stored = fs::read_to_string(&self.token_path)?;
    Ok(integrity_token(&body, branch) != stored.trim())
  }

  /// Fatal when the token does not verify
  pub fn verify(&self, branch: &str) -> RampResult<()> {
    if self.is_modified(branch)? {
      return Err(RampError::Candidate(CandidateError::Tampered {
        path: self.candidate_path.clone(),
      }));
    }
    Ok(())
  }

  pub fn remove(&self) -> RampResult<()> {
    if self.candidate_path.exists() {
      fs::remove_file(&self.candidate_path)?;
    }
    if self.token_path.exists() {
      fs::remove_file(&self.token_path)?;
    }
    Ok(())
  }
}

/// Build and persist a release candidate (the `prepare` action).
///
/// Preconditions: the model dir must be clean, the ledger must be seeded, and
/// every committed release must already be synced. A zero-change candidate is
/// valid and deployable (a no-op release).
pub fn build_candidate(
  repo: &SystemGit,
  backend: &dyn SqlBackend,
  ledger: &dyn Ledger,
  config: &RampConfig,
  target: &DbTarget,
  force: bool,
) -> RampResult<ReleaseCandidate> {
  let model_dir = &config.project.model_dir;
  let releases_dir = &config.project.releases_dir;

  let status = repo.status()?;
  if !status.is_clean() {
    debug!("Working tree is dirty:");
    for path in status.untracked.iter().chain(status.modified.iter()) {
      debug!("  - {}", path);
    }
  }
  let blockers = status.paths_under(model_dir);
  if !blockers.is_empty() {
    for path in &blockers {
      warn!("  - {}", path);
    }
    return Err(RampError::Git(GitError::ModelDirty {
      model_dir: model_dir.clone(),
    }));
  }

  let base_commit = ledger.base_commit(target)?;

  let unsynced = sync::unsynced_releases(repo, &base_commit, releases_dir)?;
  if !unsynced.is_empty() {
    return Err(RampError::with_help(
      format!(
        "Files present in {} folder that were not applied to the database.",
        releases_dir
      ),
      "Run `sqlramp sync` first.",
    ));
  }

  let changes: Vec<_> = repo
    .changed_files(&base_commit, model_dir)?
    .into_iter()
    .filter(|change| sql::is_sql_file(&change.path))
    .collect();

  for change in &changes {
    info!("  [{}] {}", change.kind.letter(), change.path);
  }
  if changes.is_empty() {
    info!(
      "No changes in {} dir to prepare release candidate file. Preparing empty file.",
      model_dir
    );
  }

  let store = CandidateStore::new(repo.work_tree(), releases_dir);
  let branch = repo.file_safe_branch()?;

  if force {
    info!("Not checking if release candidate file was changed due to --force.");
  } else if store.exists() {
    store.verify(&branch)?;
    info!("Release candidate file exists, but it was not modified. Will be replaced.");
  }

  let pin = repo.head_commit()?;

  let mut entries: Vec<ReleaseEntry> = Vec::with_capacity(changes.len());
  for change in &changes {
    entries.push(classify::classify(change, &base_commit, &pin, repo, backend, target)?);
  }

  let manual = entries.iter().filter(|entry| entry.placeholder_required()).count();
  if manual > 0 {
    info!("{} change(s) need manual review before deploy.", manual);
  }

  let mut body = format!("{}Release candidate file, branch: {}\n\n", MARKER, branch);
  for entry in &entries {
    body.push_str(&entry.render());
  }

  let token = store.save(&body, &branch)?;
  info!(
    "{} and its integrity token created.",
    store.candidate_path().display()
  );

  Ok(ReleaseCandidate { body, branch, token })
}
