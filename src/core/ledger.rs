//! Release ledger client.
//!
//! The ledger table in the target database is the only authority for what has
//! already been applied; local file presence is advisory until cross-checked
//! here. Rows are appended once per applied release and never mutated.

use crate::core::error::{RampError, RampResult, WarehouseError};
use crate::warehouse::{DbTarget, SqlBackend, quote_literal};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// One applied release
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
  pub commit_hash: String,
  pub filename: String,
  pub applied_by: String,
  pub applied_on: DateTime<Utc>,
  pub branch: String,
  pub is_production: bool,
}

/// Ledger collaborator boundary
pub trait Ledger {
  /// Watermark commit: the most recent applied release in the target database.
  ///
  /// An empty ledger is a hard error; the operator seeds the initial row.
  fn base_commit(&self, target: &DbTarget) -> RampResult<String>;

  /// Full release history, oldest first
  fn history(&self, target: &DbTarget) -> RampResult<Vec<LedgerEntry>>;

  /// Append one row for an applied release
  fn insert(&self, target: &DbTarget, filename: &str, commit: &str, branch: &str) -> RampResult<()>;
}

/// Ledger client issuing SQL through the execution backend
pub struct SqlLedger<'a> {
  backend: &'a dyn SqlBackend,
  table: String,
  applied_by: String,
}

impl<'a> SqlLedger<'a> {
  pub fn new(backend: &'a dyn SqlBackend, table: impl Into<String>, applied_by: impl Into<String>) -> Self {
    Self {
      backend,
      table: table.into(),
      applied_by: applied_by.into(),
    }
  }
}

const APPLIED_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Ledger for SqlLedger<'_> {
  fn base_commit(&self, target: &DbTarget) -> RampResult<String> {
    let query = format!(
      "SELECT commit_hash FROM {} ORDER BY applied_on DESC LIMIT 1",
      self.table
    );
    let rows = self.backend.run_statement(&query, target)?;
    let commit = rows
      .first()
      .and_then(|row| row.first())
      .cloned()
      .ok_or_else(|| {
        RampError::Warehouse(WarehouseError::LedgerEmpty {
          table: self.table.clone(),
        })
      })?;

    log::debug!("Base commit hash in {} is {}", target.database, commit);
    Ok(commit)
  }

  fn history(&self, target: &DbTarget) -> RampResult<Vec<LedgerEntry>> {
    let query = format!(
      "SELECT commit_hash, filename, applied_by, \
              to_char(applied_on AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS'), \
              branch, is_production \
         FROM {} ORDER BY applied_on",
      self.table
    );

    let rows = self.backend.run_statement(&query, target)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
      let [commit_hash, filename, applied_by, applied_on, branch, is_production] = row.as_slice() else {
        return Err(RampError::message(format!(
          "Unexpected row shape from {}: {} columns",
          self.table,
          row.len()
        )));
      };
      entries.push(LedgerEntry {
        commit_hash: commit_hash.clone(),
        filename: filename.clone(),
        applied_by: applied_by.clone(),
        applied_on: NaiveDateTime::parse_from_str(applied_on, APPLIED_ON_FORMAT)?.and_utc(),
        branch: branch.clone(),
        is_production: is_production == "t" || is_production == "true",
      });
    }
    Ok(entries)
  }

  fn insert(&self, target: &DbTarget, filename: &str, commit: &str, branch: &str) -> RampResult<()> {
    let statement = format!(
      "INSERT INTO {} (commit_hash, filename, applied_by, applied_on, branch, is_production) \
       VALUES ('{}', '{}', '{}', now(), '{}', {})",
      self.table,
      quote_literal(commit),
      quote_literal(filename),
      quote_literal(&self.applied_by),
      quote_literal(branch),
      target.is_production,
    );
    self.backend.run_statement(&statement, target)?;
    log::info!("New entry in release ledger with {}", commit);
    Ok(())
  }
}

/// In-memory ledger for unit tests
#[cfg(test)]
pub struct MockLedger {
  pub rows: std::cell::RefCell<Vec<LedgerEntry>>,
}

#[cfg(test)]
impl MockLedger {
  pub fn seeded(commit: &str) -> Self {
    let ledger = MockLedger {
      rows: std::cell::RefCell::new(Vec::new()),
    };
    ledger.rows.borrow_mut().push(LedgerEntry {
      commit_hash: commit.to_string(),
      filename: "releases/initial.sql".to_string(),
      applied_by: "seed".to_string(),
      applied_on: Utc::now(),
      branch: "main".to_string(),
      is_production: true,
    });
    ledger
  }
}

#[cfg(test)]
impl Ledger for MockLedger {
  fn base_commit(&self, _target: &DbTarget) -> RampResult<String> {
    self
      .rows
      .borrow()
      .last()
      .map(|entry| entry.commit_hash.clone())
      .ok_or_else(|| {
        RampError::Warehouse(WarehouseError::LedgerEmpty {
          table: "mock".to_string(),
        })
      })
  }

  fn history(&self, _target: &DbTarget) -> RampResult<Vec<LedgerEntry>> {
    Ok(self.rows.borrow().clone())
  }

  fn insert(&self, target: &DbTarget, filename: &str, commit: &str, branch: &str) -> RampResult<()> {
    self.rows.borrow_mut().push(LedgerEntry {
      commit_hash: commit.to_string(),
      filename: filename.to_string(),
      applied_by: "test".to_string(),
      applied_on: Utc::now(),
      branch: branch.to_string(),
      is_production: target.is_production,
    });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::warehouse::mock::MockWarehouse;

  fn target() -> DbTarget {
    DbTarget {
      database: "dwh".to_string(),
      is_production: true,
    }
  }

  #[test]
  fn test_empty_ledger_is_a_hard_error() {
    let backend = MockWarehouse::new();
    let ledger = SqlLedger::new(&backend, "public.release_ledger", "jane");
    let err = ledger.base_commit(&target()).unwrap_err();
    assert!(err.to_string().contains("release ledger"));
  }

  #[test]
  fn test_insert_escapes_and_records_production_flag() {
    let backend = MockWarehouse::new();
    let ledger = SqlLedger::new(&backend, "public.release_ledger", "o'hara");
    ledger
      .insert(&target(), "releases/main.sql", "abc123", "main")
      .unwrap();

    let statements = backend.statements.borrow();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("o''hara"));
    assert!(statements[0].contains("true"));
    assert!(statements[0].contains("releases/main.sql"));
  }
}
