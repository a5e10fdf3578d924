//! Execution backend abstraction.
//!
//! The release engine talks to the warehouse exclusively through the
//! `SqlBackend` trait: transactional batch execution, string-row queries,
//! catalog introspection, and environment (database) lifecycle. The shipped
//! implementation targets Postgres; tests use an in-memory mock.

pub mod postgres;

#[cfg(test)]
pub mod mock;

use crate::core::config::WarehouseConfig;
use crate::core::error::RampResult;
use crate::sql;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Database name prefix for per-branch development clones
pub const DEV_PREFIX: &str = "_dev_";

/// Target database identity for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTarget {
  pub database: String,
  pub is_production: bool,
}

/// One object in the live catalog
#[derive(Debug, Clone)]
pub struct CatalogObject {
  pub name: String,
  pub object_type: String,
  pub last_altered: Option<DateTime<Utc>>,
}

/// Execution backend boundary (connection, cursor, transaction primitives)
pub trait SqlBackend {
  /// Execute a release batch inside a single transaction.
  ///
  /// Statements resuming a scheduled task are skipped (logged) whenever the
  /// target is not production; empty statements warn and continue; any other
  /// failure rolls back the whole batch and surfaces the offending statement.
  fn perform_release(&self, sql: &str, target: &DbTarget) -> RampResult<()>;

  /// Run one statement with autocommit and return all rows as strings
  fn run_statement(&self, sql: &str, target: &DbTarget) -> RampResult<Vec<Vec<String>>>;

  /// Current object catalog, keyed by `TYPE#NAME`
  fn catalog(&self, target: &DbTarget) -> RampResult<BTreeMap<String, CatalogObject>>;

  /// Definition text of a single live object, None when it does not exist
  fn object_ddl(&self, target: &DbTarget, object_type: &str, name: &str) -> RampResult<Option<String>>;

  /// Create `new_db` as a clone of `source`
  fn clone_database(&self, source: &str, new_db: &str) -> RampResult<()>;

  /// Drop a database
  fn drop_database(&self, name: &str) -> RampResult<()>;

  /// Whether a database exists
  fn database_exists(&self, name: &str) -> RampResult<bool>;

  /// Names of all development clone databases
  fn list_dev_databases(&self) -> RampResult<Vec<String>>;
}

/// Catalog map key for one object
pub fn catalog_key(object_type: &str, name: &str) -> String {
  format!("{}#{}", object_type, name).to_uppercase()
}

/// Branch name reduced to a valid database identifier
pub fn db_safe_branch(branch: &str) -> String {
  branch
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
    .collect()
}

/// Map a branch onto the database its releases land in.
///
/// The production branch targets the production database, the staging branch
/// targets staging, and every other branch targets a `_dev_` clone named
/// after it (truncated to keep identifiers short).
pub fn database_for_branch(config: &WarehouseConfig, branch: &str) -> DbTarget {
  if branch == config.production_branch {
    DbTarget {
      database: config.production_db.clone(),
      is_production: true,
    }
  } else if branch == config.staging_branch {
    DbTarget {
      database: config.staging_db.clone(),
      is_production: false,
    }
  } else {
    let safe = db_safe_branch(branch);
    let clipped = &safe[..safe.len().min(30)];
    DbTarget {
      database: format!("{}{}", DEV_PREFIX, clipped),
      is_production: false,
    }
  }
}

/// Escape a string for inclusion in a single-quoted SQL literal
pub fn quote_literal(value: &str) -> String {
  value.replace('\'', "''")
}

/// One step of a planned release batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStep {
  /// Execute this statement
  Execute(String),
  /// Statement matched the resume-task pattern on a non-production target
  SkipResumeTask(String),
  /// Empty statement (stray separator or comment-only block)
  EmptyStatement,
}

/// Split a release script into ordered batch steps with environment-aware
/// filtering applied. Shared by every backend so the skip/warn policy cannot
/// drift between implementations.
pub fn plan_batch(sql_text: &str, is_production: bool) -> Vec<BatchStep> {
  sql::split_statements(sql_text)
    .into_iter()
    .map(|statement| {
      if statement.is_empty() {
        BatchStep::EmptyStatement
      } else if !is_production && sql::is_resume_task(&statement) {
        BatchStep::SkipResumeTask(statement)
      } else {
        BatchStep::Execute(statement)
      }
    })
    .collect()
}
