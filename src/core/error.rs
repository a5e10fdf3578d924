//! Error types for sqlramp with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to users. Every fatal error prints a single-line
//! diagnostic and terminates the process with a non-zero status.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for sqlramp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, warehouse, I/O)
  System = 2,
  /// Validation failure (bad SQL objects, tampered candidates, placeholders)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for sqlramp
#[derive(Debug)]
pub enum RampError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// SQL source validation errors
  Sql(SqlError),

  /// Release candidate lifecycle errors
  Candidate(CandidateError),

  /// Warehouse / execution backend errors
  Warehouse(WarehouseError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RampError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RampError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RampError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RampError::Message { message, context, help } => RampError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RampError::Config(_) => ExitCode::User,
      RampError::Git(_) => ExitCode::System,
      RampError::Sql(_) => ExitCode::Validation,
      RampError::Candidate(_) => ExitCode::Validation,
      RampError::Warehouse(_) => ExitCode::System,
      RampError::Io(_) => ExitCode::System,
      RampError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RampError::Config(e) => e.help_message(),
      RampError::Git(e) => e.help_message(),
      RampError::Sql(e) => e.help_message(),
      RampError::Candidate(e) => e.help_message(),
      RampError::Warehouse(e) => e.help_message(),
      RampError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RampError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RampError::Config(e) => write!(f, "{}", e),
      RampError::Git(e) => write!(f, "{}", e),
      RampError::Sql(e) => write!(f, "{}", e),
      RampError::Candidate(e) => write!(f, "{}", e),
      RampError::Warehouse(e) => write!(f, "{}", e),
      RampError::Io(e) => write!(f, "I/O error: {}", e),
      RampError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RampError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RampError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RampError {
  fn from(err: io::Error) -> Self {
    RampError::Io(err)
  }
}

impl From<String> for RampError {
  fn from(msg: String) -> Self {
    RampError::message(msg)
  }
}

impl From<&str> for RampError {
  fn from(msg: &str) -> Self {
    RampError::message(msg)
  }
}

impl From<toml_edit::TomlError> for RampError {
  fn from(err: toml_edit::TomlError) -> Self {
    RampError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for RampError {
  fn from(err: toml_edit::de::Error) -> Self {
    RampError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for RampError {
  fn from(err: toml_edit::ser::Error) -> Self {
    RampError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for RampError {
  fn from(err: serde_json::Error) -> Self {
    RampError::message(format!("JSON error: {}", err))
  }
}

impl From<std::str::Utf8Error> for RampError {
  fn from(err: std::str::Utf8Error) -> Self {
    RampError::message(format!("UTF-8 error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RampError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RampError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::env::VarError> for RampError {
  fn from(err: std::env::VarError) -> Self {
    RampError::message(format!("Environment variable error: {}", err))
  }
}

impl From<postgres::Error> for RampError {
  fn from(err: postgres::Error) -> Self {
    RampError::Warehouse(WarehouseError::Backend {
      message: err.to_string(),
    })
  }
}

impl From<chrono::ParseError> for RampError {
  fn from(err: chrono::ParseError) -> Self {
    RampError::message(format!("Timestamp parse error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// sqlramp.toml not found
  NotFound { search_root: PathBuf },

  /// User connection file not found
  UserConfigNotFound { path: PathBuf },

  /// Missing required field
  MissingField { field: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a sqlramp.toml at the repository root naming the model and releases directories.".to_string())
      }
      ConfigError::UserConfigNotFound { path } => Some(format!(
        "Create {} with your warehouse connection settings ([connection] user, host, port).",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No sqlramp configuration found.\nSearched from: {}",
          search_root.display()
        )
      }
      ConfigError::UserConfigNotFound { path } => {
        write!(f, "User connection file not found: {}", path.display())
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Commit not found
  CommitNotFound { sha: String },

  /// The monitored source directory has uncommitted or untracked paths
  ModelDirty { model_dir: String },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::ModelDirty { model_dir } => Some(format!(
        "Commit or stash your changes under {} before preparing a release.",
        model_dir
      )),
      GitError::RepoNotFound { path } => Some(format!(
        "Run sqlramp from inside a git checkout (no repository at {}).",
        path.display()
      )),
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Pull first.".to_string())
        } else {
          None
        }
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::CommitNotFound { sha } => {
        write!(f, "Commit not found: {}", sha)
      }
      GitError::ModelDirty { model_dir } => {
        write!(f, "{} is not clean! Commit your changes.", model_dir)
      }
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", remote, branch, reason)
      }
    }
  }
}

/// SQL source validation errors
#[derive(Debug)]
pub enum SqlError {
  /// File path carries no recognizable object-type directory
  NoTypeDir { path: String },

  /// File contains no recognizable CREATE statement
  NoCreateStatement { path: String },

  /// Stateful object defined with CREATE OR REPLACE
  DangerousReplace { object_type: String, path: String },

  /// Stateful object file carries a DROP statement
  DangerousDrop { object_type: String, path: String },
}

impl SqlError {
  fn help_message(&self) -> Option<String> {
    match self {
      SqlError::NoTypeDir { .. } => {
        Some("Place the file under a directory named after its object type (tables/, views/, ...).".to_string())
      }
      SqlError::NoCreateStatement { .. } => {
        Some("Every model file must hold exactly one CREATE <type> <name> statement.".to_string())
      }
      SqlError::DangerousReplace { object_type, .. } => Some(format!(
        "Blindly replacing a {} can drop data. Use CREATE {} IF NOT EXISTS and release alterations manually.",
        object_type, object_type
      )),
      SqlError::DangerousDrop { .. } => {
        Some("DROP statements for stateful objects belong in a reviewed release, not in the model tree.".to_string())
      }
    }
  }
}

impl fmt::Display for SqlError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SqlError::NoTypeDir { path } => {
        write!(f, "Can't find a valid object type prefix in {}", path)
      }
      SqlError::NoCreateStatement { path } => {
        write!(f, "Can't find a valid SQL CREATE statement in {}", path)
      }
      SqlError::DangerousReplace { object_type, path } => {
        write!(
          f,
          "Dangerous SQL CREATE {} statement with OR REPLACE in {}",
          object_type, path
        )
      }
      SqlError::DangerousDrop { object_type, path } => {
        write!(f, "Dangerous SQL DROP {} statement in {}", object_type, path)
      }
    }
  }
}

/// Release candidate lifecycle errors
#[derive(Debug)]
pub enum CandidateError {
  /// No candidate file on disk
  Missing { path: PathBuf },

  /// Candidate exists but its token file is missing
  TokenMissing { path: PathBuf },

  /// Candidate content or branch no longer matches the stored token
  Tampered { path: PathBuf },

  /// Unresolved manual-review placeholder left in the candidate
  PlaceholderFound { placeholder: String },
}

impl CandidateError {
  fn help_message(&self) -> Option<String> {
    match self {
      CandidateError::Missing { .. } => Some("Run `sqlramp prepare` first.".to_string()),
      CandidateError::TokenMissing { .. } => {
        Some("Re-create the candidate with `sqlramp prepare --force`.".to_string())
      }
      CandidateError::Tampered { .. } => Some(
        "If you edited the candidate to resolve a placeholder, acknowledge the edit with --force; \
         otherwise re-create it with `sqlramp prepare --force`."
          .to_string(),
      ),
      CandidateError::PlaceholderFound { placeholder } => Some(format!(
        "Replace every {} with a valid SQL statement or remove the line.",
        placeholder
      )),
    }
  }
}

impl fmt::Display for CandidateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CandidateError::Missing { path } => {
        write!(
          f,
          "Release candidate file {} does not exist, can't make a release.",
          path.display()
        )
      }
      CandidateError::TokenMissing { path } => {
        write!(
          f,
          "Release candidate {} exists but its token file is missing.",
          path.display()
        )
      }
      CandidateError::Tampered { path } => {
        write!(
          f,
          "Release candidate {} was changed (or you changed branch) since it was prepared.",
          path.display()
        )
      }
      CandidateError::PlaceholderFound { placeholder } => {
        write!(f, "Code placeholder {} found in the release candidate file.", placeholder)
      }
    }
  }
}

/// Warehouse / execution backend errors
#[derive(Debug)]
pub enum WarehouseError {
  /// Underlying client error (connection, protocol)
  Backend { message: String },

  /// A statement aborted the release batch
  StatementFailed { statement: String, message: String },

  /// The release ledger holds no rows
  LedgerEmpty { table: String },

  /// Refused to touch a protected database
  Protected { database: String },
}

impl WarehouseError {
  fn help_message(&self) -> Option<String> {
    match self {
      WarehouseError::Backend { message } if message.contains("does not exist") => {
        Some("Is this your first run on this branch? Create the branch database with `sqlramp clone`.".to_string())
      }
      WarehouseError::LedgerEmpty { table } => Some(format!(
        "Seed {} with an initial row pointing at the commit your database state corresponds to.",
        table
      )),
      _ => None,
    }
  }
}

impl fmt::Display for WarehouseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WarehouseError::Backend { message } => write!(f, "Warehouse error: {}", message),
      WarehouseError::StatementFailed { statement, message } => {
        write!(f, "Release failed due to this statement:\n{}\n{}", statement, message)
      }
      WarehouseError::LedgerEmpty { table } => {
        write!(f, "No data in release ledger table {}.", table)
      }
      WarehouseError::Protected { database } => {
        write!(f, "Refusing to touch protected database {}.", database)
      }
    }
  }
}

/// Result type alias for sqlramp
pub type RampResult<T> = Result<T, RampError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RampResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RampResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RampError>,
{
  fn context(self, ctx: impl Into<String>) -> RampResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RampResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with colors and help text
pub fn print_error(error: &RampError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

/// Convert anyhow::Error to RampError (for transition period)
impl From<anyhow::Error> for RampError {
  fn from(err: anyhow::Error) -> Self {
    RampError::message(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_category() {
    let tampered = RampError::Candidate(CandidateError::Tampered {
      path: PathBuf::from("releases/release_candidate.sql"),
    });
    assert_eq!(tampered.exit_code(), ExitCode::Validation);

    let dirty = RampError::Git(GitError::ModelDirty {
      model_dir: "model".to_string(),
    });
    assert_eq!(dirty.exit_code(), ExitCode::System);

    assert_eq!(RampError::message("bad flag").exit_code(), ExitCode::User);
  }

  #[test]
  fn test_context_chains_on_message() {
    let err = RampError::message("outer").context("inner detail");
    let rendered = err.to_string();
    assert!(rendered.contains("outer"));
    assert!(rendered.contains("inner detail"));
  }

  #[test]
  fn test_placeholder_help_names_marker() {
    let err = RampError::Candidate(CandidateError::PlaceholderFound {
      placeholder: "<<HERE>>".to_string(),
    });
    assert!(err.help_message().unwrap().contains("<<HERE>>"));
  }
}
