//! Additional operations for SystemGit (diffs, history, release commits)

use super::system_git::SystemGit;
use super::{Change, ChangeKind, CommitInfo, TreeStatus};
use crate::core::error::{GitError, RampError, RampResult, ResultExt};
use log::warn;

impl SystemGit {
  /// Enumerate paths changed between `base` and the working tree under `prefix`.
  ///
  /// Rename detection is on; entries come back in git's diff order
  /// (the commit-to-working-tree order releases are built in).
  pub fn changed_files(&self, base: &str, prefix: &str) -> RampResult<Vec<Change>> {
    let output = self
      .git_cmd()
      .args(["diff", "--name-status", "-M", base, "--", prefix])
      .output()
      .context("Failed to run git diff --name-status")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git diff --name-status {}", base),
        stderr: stderr.to_string(),
      }));
    }

    Ok(parse_name_status(&String::from_utf8_lossy(&output.stdout)))
  }

  /// Uncommitted and untracked paths in the working tree
  pub fn status(&self) -> RampResult<TreeStatus> {
    let output = self
      .git_cmd()
      .args(["status", "--porcelain"])
      .output()
      .context("Failed to run git status")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: "git status --porcelain".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
  }

  /// Hash of the last commit touching `path`
  pub fn last_commit_hash(&self, path: &str) -> RampResult<String> {
    Ok(self.last_commit_info(path)?.sha)
  }

  /// Metadata of the last commit touching `path`
  pub fn last_commit_info(&self, path: &str) -> RampResult<CommitInfo> {
    let output = self
      .git_cmd()
      .args(["log", "-1", "--pretty=%H%n%an%n%ai%n%s", "--", path])
      .output()
      .context("Failed to run git log")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git log -1 -- {}", path),
        stderr: stderr.to_string(),
      }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let sha = lines
      .next()
      .filter(|s| !s.is_empty())
      .ok_or_else(|| {
        RampError::Git(GitError::CommitNotFound {
          sha: format!("(no commit touches {})", path),
        })
      })?
      .to_string();

    Ok(CommitInfo {
      sha,
      author: lines.next().unwrap_or("").to_string(),
      date: lines.next().unwrap_or("").to_string(),
      subject: lines.next().unwrap_or("").to_string(),
    })
  }

  /// Unified diff of `path` between `base` and the working tree.
  ///
  /// Zero context lines, whitespace-change noise suppressed; the caller owns
  /// comment-prefixing for the release-candidate rendering.
  pub fn file_diff(&self, base: &str, path: &str) -> RampResult<String> {
    let output = self
      .git_cmd()
      .args([
        "diff",
        base,
        "--unified=0",
        "--no-prefix",
        "--ignore-space-change",
        "--",
        path,
      ])
      .output()
      .context("Failed to run git diff")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git diff {} -- {}", base, path),
        stderr: stderr.to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Position of the last commit touching each path since `base`, in
  /// ascending commit order. Used to replay release files oldest-first.
  pub fn path_commit_order(&self, base: &str, prefix: &str) -> RampResult<std::collections::HashMap<String, usize>> {
    let range = format!("{}..HEAD", base);
    let output = self
      .git_cmd()
      .args(["log", "--reverse", "--name-only", "--pretty=format:%H", &range, "--", prefix])
      .output()
      .context("Failed to run git log --name-only")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git log --reverse {}", range),
        stderr: stderr.to_string(),
      }));
    }

    let mut order = std::collections::HashMap::new();
    let mut position = 0usize;
    for line in String::from_utf8_lossy(&output.stdout).lines() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      if line.len() == 40 && line.chars().all(|c| c.is_ascii_hexdigit()) {
        position += 1;
      } else {
        order.insert(line.to_string(), position);
      }
    }

    Ok(order)
  }

  /// Colored diff of `prefix` against `branch`, with file header noise removed
  pub fn diff_against_branch(&self, branch: &str, prefix: &str) -> RampResult<String> {
    let output = self
      .git_cmd()
      .args(["diff", branch, "--color=always", "--", prefix])
      .output()
      .context("Failed to run git diff")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git diff {}", branch),
        stderr: stderr.to_string(),
      }));
    }

    let filtered: Vec<String> = String::from_utf8_lossy(&output.stdout)
      .lines()
      .filter(|l| !l.contains("--- a/") && !l.contains("+++ b/"))
      .map(|l| l.to_string())
      .collect();

    Ok(filtered.join("\n"))
  }

  /// Stage `path`, commit it, and push to origin.
  ///
  /// A failed push is a warning, not an error: the release file and its
  /// ledger row are the durable record, and the operator can push later.
  pub fn commit_and_push(&self, path: &str, message: &str) -> RampResult<()> {
    let add = self
      .git_cmd()
      .args(["add", path])
      .output()
      .context("Failed to run git add")?;
    if !add.status.success() {
      return Err(RampError::Git(GitError::CommandFailed {
        command: format!("git add {}", path),
        stderr: String::from_utf8_lossy(&add.stderr).to_string(),
      }));
    }

    let commit = self
      .git_cmd()
      .args(["commit", "-m", message, "--", path])
      .output()
      .context("Failed to run git commit")?;
    if !commit.status.success() {
      return Err(RampError::Git(GitError::CommandFailed {
        command: "git commit".to_string(),
        stderr: String::from_utf8_lossy(&commit.stderr).to_string(),
      }));
    }

    let push = self
      .git_cmd()
      .args(["push", "origin", "HEAD"])
      .output()
      .context("Failed to run git push")?;
    if !push.status.success() {
      let failure = GitError::PushFailed {
        remote: "origin".to_string(),
        branch: "HEAD".to_string(),
        reason: String::from_utf8_lossy(&push.stderr).trim().to_string(),
      };
      warn!("Can't push changes to remote: {}", failure);
    }

    Ok(())
  }

  /// List local branch names, refreshing remotes first when possible
  pub fn branches(&self) -> RampResult<Vec<String>> {
    let fetch = self.git_cmd().args(["fetch", "--all", "--prune"]).output();
    match fetch {
      Ok(out) if !out.status.success() => {
        warn!("git fetch failed: {}", String::from_utf8_lossy(&out.stderr).trim());
      }
      Err(e) => warn!("git fetch failed: {}", e),
      _ => {}
    }

    let output = self
      .git_cmd()
      .args(["branch", "--format=%(refname:short)"])
      .output()
      .context("Failed to list branches")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(RampError::Git(GitError::CommandFailed {
        command: "git branch".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }
}

/// Parse `git diff --name-status -M` output
fn parse_name_status(output: &str) -> Vec<Change> {
  let mut changes = Vec::new();

  for line in output.lines() {
    let mut fields = line.split('\t');
    let Some(status) = fields.next().filter(|s| !s.is_empty()) else {
      continue;
    };
    let kind = ChangeKind::from_status(status);

    match kind {
      ChangeKind::Renamed => {
        let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
          continue;
        };
        changes.push(Change {
          kind,
          path: new.to_string(),
          old_path: Some(old.to_string()),
        });
      }
      _ => {
        let Some(path) = fields.next() else { continue };
        changes.push(Change {
          kind,
          path: path.to_string(),
          old_path: None,
        });
      }
    }
  }

  changes
}

/// Parse `git status --porcelain` output
fn parse_porcelain(output: &str) -> TreeStatus {
  let mut status = TreeStatus::default();

  for line in output.lines() {
    if line.len() < 4 {
      continue;
    }
    let (code, rest) = line.split_at(3);
    // Renames show as "R  old -> new"; the new path is what matters
    let path = rest.split(" -> ").last().unwrap_or(rest).to_string();

    if code.starts_with("??") {
      status.untracked.push(path);
    } else {
      status.modified.push(path);
    }
  }

  status
}
