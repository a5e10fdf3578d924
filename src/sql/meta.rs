//! Object metadata derived from a single SQL definition file.
//!
//! Every model file maps to exactly one object; a file without a recognizable
//! `CREATE <type> <name>` statement is a hard error. Object types whose
//! redefinition is idempotent and non-destructive are "safe DDL"; stateful
//! objects (tables, streams) are not and always go through manual review.

use crate::core::error::{RampError, RampResult, SqlError};
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

/// Object-type vocabulary recognized in CREATE statements.
/// Longer alternatives first so `external table` wins over `table`.
const OBJECT_TYPE: &str = "procedure|function|external\\s+table|table|sequence|materialized\\s+view|view|file\\s+format|stage|pipe|stream|task";

static EXTENSIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(sql|vw|tbl)$").unwrap());

static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(
    r"(?i)create\s+(?:or\s+replace\s+)?(?:local\s+|global\s+)?(?:temp\s+|temporary\s+|volatile\s+)?(?:transient\s+)?(?P<o_type>{})\s+(?:if\s+not\s+exists\s+)?(?P<o_name>[.\w-]+)",
    OBJECT_TYPE
  ))
  .unwrap()
});

static TYPE_DIR: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!("(?i)/(?P<dir_type>{})s?/", OBJECT_TYPE.replace("\\s+", "."))).unwrap()
});

static OR_REPLACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)create\s+or\s+replace\s+").unwrap());

static IF_NOT_EXISTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)if\s+not\s+exists").unwrap());

static DROP: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(&format!(r"(?i)drop\s+(?:{})", OBJECT_TYPE)).unwrap());

static RESUME_TASK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)alter\s+task\s+[.\w-]+\s+resume\s*;?").unwrap());

/// Whether a path looks like a SQL definition file
pub fn is_sql_file(path: &str) -> bool {
  EXTENSIONS.is_match(path)
}

/// Whether a statement resumes a scheduled task (skipped off production)
pub fn is_resume_task(statement: &str) -> bool {
  RESUME_TASK.is_match(statement)
}

/// Metadata of one SQL object definition
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
  /// Object name, uppercased
  pub name: String,
  /// Object type, uppercased with inner whitespace collapsed to `_`
  pub object_type: String,
  /// True when blind redefinition is idempotent and non-destructive
  pub safe_ddl: bool,
  /// Full source text of the definition
  pub text: String,
}

impl ObjectMetadata {
  /// Derive metadata from a file's relative path and content.
  ///
  /// Hard errors: no object-type directory in the path, no CREATE statement,
  /// and for stateful objects, OR REPLACE or DROP anywhere in the file.
  pub fn from_text(path: &str, text: &str) -> RampResult<ObjectMetadata> {
    let dir_type = TYPE_DIR
      .captures(path)
      .and_then(|c| c.name("dir_type"))
      .map(|m| normalize_type(m.as_str()))
      .ok_or_else(|| RampError::Sql(SqlError::NoTypeDir { path: path.to_string() }))?;

    let caps = TYPE_NAME.captures(text).ok_or_else(|| {
      RampError::Sql(SqlError::NoCreateStatement {
        path: path.to_string(),
      })
    })?;

    let object_type = normalize_type(&caps["o_type"]);
    let name = caps["o_name"].to_uppercase();

    if dir_type != object_type {
      warn!(
        "SQL CREATE {} statement in folder named {} in {}",
        object_type, dir_type, path
      );
    }

    let safe_ddl = !matches!(object_type.as_str(), "TABLE" | "STREAM");

    if safe_ddl {
      if !OR_REPLACE.is_match(text) {
        warn!("SQL CREATE {} statement without OR REPLACE in {}", object_type, path);
      }
    } else {
      if OR_REPLACE.is_match(text) {
        return Err(RampError::Sql(SqlError::DangerousReplace {
          object_type,
          path: path.to_string(),
        }));
      }
      if DROP.is_match(text) {
        return Err(RampError::Sql(SqlError::DangerousDrop {
          object_type,
          path: path.to_string(),
        }));
      }
      if !IF_NOT_EXISTS.is_match(text) {
        debug!("SQL CREATE {} statement without IF NOT EXISTS in {}", object_type, path);
      }
    }

    Ok(ObjectMetadata {
      name,
      object_type,
      safe_ddl,
      text: text.to_string(),
    })
  }

  /// Derive metadata by reading `rel_path` under `root`
  pub fn from_file(root: &std::path::Path, rel_path: &str) -> RampResult<ObjectMetadata> {
    let text = std::fs::read_to_string(root.join(rel_path))
      .map_err(|e| RampError::message(format!("Failed to read {}: {}", rel_path, e)))?;
    Self::from_text(rel_path, &text)
  }
}

/// Uppercase an object type and collapse its inner whitespace to `_`
fn normalize_type(raw: &str) -> String {
  raw
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("_")
    .replace('.', "_")
    .to_uppercase()
}
