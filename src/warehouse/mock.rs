//! In-memory warehouse used by unit tests.
//!
//! Records every executed batch, emulates rollback by discarding partially
//! executed batches, and serves a configurable object catalog.

use super::{BatchStep, CatalogObject, DbTarget, SqlBackend, catalog_key, plan_batch};
use crate::core::error::{RampError, RampResult, WarehouseError};
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MockWarehouse {
  /// Catalog: key -> (object_type, ddl)
  pub objects: RefCell<BTreeMap<String, (String, String)>>,
  /// Committed release batches: (database, statements)
  pub batches: RefCell<Vec<(String, Vec<String>)>>,
  /// Statements skipped by the resume-task filter
  pub skipped: RefCell<Vec<String>>,
  /// Single statements run outside a release batch
  pub statements: RefCell<Vec<String>>,
  /// Existing databases
  pub databases: RefCell<Vec<String>>,
  /// Abort any batch containing this substring
  pub fail_on: RefCell<Option<String>>,
}

impl MockWarehouse {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_object(self, object_type: &str, name: &str, ddl: &str) -> Self {
    self.objects.borrow_mut().insert(
      catalog_key(object_type, name),
      (object_type.to_uppercase(), ddl.to_string()),
    );
    self
  }

  /// Total statements committed across all batches
  pub fn executed_count(&self) -> usize {
    self.batches.borrow().iter().map(|(_, stmts)| stmts.len()).sum()
  }
}

impl SqlBackend for MockWarehouse {
  fn perform_release(&self, sql_text: &str, target: &DbTarget) -> RampResult<()> {
    let mut executed = Vec::new();
    for step in plan_batch(sql_text, target.is_production) {
      match step {
        BatchStep::EmptyStatement => {}
        BatchStep::SkipResumeTask(statement) => self.skipped.borrow_mut().push(statement),
        BatchStep::Execute(statement) => {
          if let Some(needle) = self.fail_on.borrow().as_deref()
            && statement.contains(needle)
          {
            // Rollback: nothing from this batch is recorded
            return Err(RampError::Warehouse(WarehouseError::StatementFailed {
              statement,
              message: "mock failure".to_string(),
            }));
          }
          executed.push(statement);
        }
      }
    }
    self.batches.borrow_mut().push((target.database.clone(), executed));
    Ok(())
  }

  fn run_statement(&self, sql_text: &str, _target: &DbTarget) -> RampResult<Vec<Vec<String>>> {
    self.statements.borrow_mut().push(sql_text.to_string());
    Ok(vec![])
  }

  fn catalog(&self, _target: &DbTarget) -> RampResult<BTreeMap<String, CatalogObject>> {
    Ok(
      self
        .objects
        .borrow()
        .iter()
        .map(|(key, (object_type, _))| {
          let name = key.split('#').next_back().unwrap_or_default().to_string();
          (
            key.clone(),
            CatalogObject {
              name,
              object_type: object_type.clone(),
              last_altered: None,
            },
          )
        })
        .collect(),
    )
  }

  fn object_ddl(&self, _target: &DbTarget, object_type: &str, name: &str) -> RampResult<Option<String>> {
    Ok(
      self
        .objects
        .borrow()
        .get(&catalog_key(object_type, name))
        .map(|(_, ddl)| ddl.clone()),
    )
  }

  fn clone_database(&self, _source: &str, new_db: &str) -> RampResult<()> {
    self.databases.borrow_mut().push(new_db.to_string());
    Ok(())
  }

  fn drop_database(&self, name: &str) -> RampResult<()> {
    self.databases.borrow_mut().retain(|db| db != name);
    Ok(())
  }

  fn database_exists(&self, name: &str) -> RampResult<bool> {
    Ok(self.databases.borrow().iter().any(|db| db == name))
  }

  fn list_dev_databases(&self) -> RampResult<Vec<String>> {
    Ok(
      self
        .databases
        .borrow()
        .iter()
        .filter(|db| db.starts_with(super::DEV_PREFIX))
        .cloned()
        .collect(),
    )
  }
}
