//! Postgres execution backend.
//!
//! One short-lived connection per operation, simple-query protocol
//! throughout: release scripts are plain DDL/DML text, never parameterized.

use super::{BatchStep, CatalogObject, DbTarget, DEV_PREFIX, SqlBackend, catalog_key, plan_batch, quote_literal};
use crate::core::config::ConnectionConfig;
use crate::core::error::{RampError, RampResult, WarehouseError};
use crate::sql;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use postgres::{Client, NoTls, SimpleQueryMessage};
use std::collections::BTreeMap;

/// Maintenance database used for environment lifecycle statements
const ADMIN_DB: &str = "postgres";

/// Postgres-backed warehouse
pub struct PgWarehouse {
  conn: ConnectionConfig,
}

impl PgWarehouse {
  pub fn new(conn: ConnectionConfig) -> Self {
    Self { conn }
  }

  fn client(&self, database: &str) -> RampResult<Client> {
    let mut config = postgres::Config::new();
    config
      .host(&self.conn.host)
      .port(self.conn.port)
      .user(&self.conn.user)
      .dbname(database);
    if let Some(ref password) = self.conn.password {
      config.password(password);
    }

    debug!("Connecting to {} as {}", database, self.conn.user);
    Ok(config.connect(NoTls)?)
  }

  fn simple_rows(client: &mut Client, sql_text: &str) -> RampResult<Vec<Vec<String>>> {
    let messages = client.simple_query(sql_text)?;
    Ok(collect_rows(&messages))
  }
}

fn collect_rows(messages: &[SimpleQueryMessage]) -> Vec<Vec<String>> {
  let mut rows = Vec::new();
  for message in messages {
    if let SimpleQueryMessage::Row(row) = message {
      let mut values = Vec::with_capacity(row.len());
      for i in 0..row.len() {
        values.push(row.get(i).unwrap_or("").to_string());
      }
      rows.push(values);
    }
  }
  rows
}

impl SqlBackend for PgWarehouse {
  fn perform_release(&self, sql_text: &str, target: &DbTarget) -> RampResult<()> {
    let mut client = self.client(&target.database)?;
    let mut tx = client.transaction()?;
    debug!("BEGIN TRANSACTION");

    for step in plan_batch(sql_text, target.is_production) {
      match step {
        BatchStep::EmptyStatement => {
          warn!("Found empty SQL statement. Too many ';' in file?");
        }
        BatchStep::SkipResumeTask(statement) => {
          info!(
            "Skipping '{}' statement as this is not production",
            statement.replace('\n', " ")
          );
        }
        BatchStep::Execute(statement) => {
          debug!("  running statement:");
          if log::log_enabled!(log::Level::Debug) {
            sql::print_sql(&statement);
          }
          let messages = match tx.simple_query(&statement) {
            Ok(messages) => messages,
            Err(e) => {
              debug!("ROLLBACK TRANSACTION");
              return Err(RampError::Warehouse(WarehouseError::StatementFailed {
                statement,
                message: e.to_string(),
              }));
            }
          };
          for message in &messages {
            if let SimpleQueryMessage::CommandComplete(count) = message {
              debug!("  {} row(s) affected", count);
            }
          }
          if let Some(first) = collect_rows(&messages).first() {
            info!("  {}", first.join(", "));
          }
        }
      }
    }

    debug!("COMMIT TRANSACTION");
    tx.commit()?;
    Ok(())
  }

  fn run_statement(&self, sql_text: &str, target: &DbTarget) -> RampResult<Vec<Vec<String>>> {
    let mut client = self.client(&target.database)?;
    if log::log_enabled!(log::Level::Debug) {
      sql::print_sql(sql_text);
    }
    Self::simple_rows(&mut client, sql_text)
  }

  fn catalog(&self, target: &DbTarget) -> RampResult<BTreeMap<String, CatalogObject>> {
    let query = "\
      SELECT table_schema, table_name, \
             CASE table_type WHEN 'BASE TABLE' THEN 'TABLE' ELSE 'VIEW' END, '' \
        FROM information_schema.tables \
       WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
      UNION ALL \
      SELECT routine_schema, routine_name, routine_type, to_char(last_altered, 'YYYY-MM-DD HH24:MI:SS') \
        FROM information_schema.routines \
       WHERE routine_schema NOT IN ('pg_catalog', 'information_schema') \
      UNION ALL \
      SELECT schemaname, matviewname, 'MATERIALIZED_VIEW', '' FROM pg_matviews \
      UNION ALL \
      SELECT sequence_schema, sequence_name, 'SEQUENCE', '' FROM information_schema.sequences";

    let rows = self.run_statement(query, target)?;
    let mut objects = BTreeMap::new();
    for row in rows {
      let [schema, name, object_type, altered] = row.as_slice() else {
        continue;
      };
      let qualified = format!("{}.{}", schema, name).to_uppercase();
      let last_altered = NaiveDateTime::parse_from_str(altered, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc());
      objects.insert(
        catalog_key(object_type, &qualified),
        CatalogObject {
          name: qualified,
          object_type: object_type.to_uppercase(),
          last_altered,
        },
      );
    }
    Ok(objects)
  }

  fn object_ddl(&self, target: &DbTarget, object_type: &str, name: &str) -> RampResult<Option<String>> {
    let lname = quote_literal(&name.to_lowercase());
    match object_type {
      "VIEW" | "MATERIALIZED_VIEW" => {
        let query = format!(
          "SELECT pg_get_viewdef(to_regclass('{}'), true) WHERE to_regclass('{}') IS NOT NULL",
          lname, lname
        );
        let rows = self.run_statement(&query, target)?;
        Ok(rows.first().map(|r| format!("CREATE VIEW {} AS\n{}", name, r[0])))
      }
      "FUNCTION" | "PROCEDURE" => {
        let query = format!(
          "SELECT pg_get_functiondef(p.oid) \
             FROM pg_proc p JOIN pg_namespace n ON n.oid = p.pronamespace \
            WHERE n.nspname || '.' || p.proname = '{}' OR p.proname = '{}'",
          lname, lname
        );
        let rows = self.run_statement(&query, target)?;
        Ok(rows.first().map(|r| r[0].clone()))
      }
      "TABLE" => {
        let query = format!(
          "SELECT column_name, data_type, is_nullable, coalesce(column_default, '') \
             FROM information_schema.columns \
            WHERE table_schema || '.' || table_name = '{}' OR table_name = '{}' \
            ORDER BY ordinal_position",
          lname, lname
        );
        let rows = self.run_statement(&query, target)?;
        if rows.is_empty() {
          return Ok(None);
        }
        Ok(Some(render_table_ddl(name, &rows)))
      }
      _ => {
        // No definition source for the remaining types; existence via catalog
        let exists = self
          .catalog(target)?
          .contains_key(&catalog_key(object_type, name));
        Ok(if exists {
          Some(format!("-- {} {} exists (definition not retrievable)", object_type, name))
        } else {
          None
        })
      }
    }
  }

  fn clone_database(&self, source: &str, new_db: &str) -> RampResult<()> {
    let mut client = self.client(ADMIN_DB)?;
    let statement = format!("CREATE DATABASE {} TEMPLATE {}", new_db, source);
    info!("Cloning {} into {}", source, new_db);
    client.simple_query(&statement)?;
    Ok(())
  }

  fn drop_database(&self, name: &str) -> RampResult<()> {
    let mut client = self.client(ADMIN_DB)?;
    client.simple_query(&format!("DROP DATABASE {}", name))?;
    Ok(())
  }

  fn database_exists(&self, name: &str) -> RampResult<bool> {
    let mut client = self.client(ADMIN_DB)?;
    let rows = Self::simple_rows(
      &mut client,
      &format!(
        "SELECT count(*) FROM pg_database WHERE datname = '{}'",
        quote_literal(name)
      ),
    )?;
    Ok(rows.first().map(|r| r[0].as_str()) == Some("1"))
  }

  fn list_dev_databases(&self) -> RampResult<Vec<String>> {
    let mut client = self.client(ADMIN_DB)?;
    let rows = Self::simple_rows(
      &mut client,
      &format!(
        "SELECT datname FROM pg_database WHERE datname LIKE '{}%' ORDER BY datname",
        DEV_PREFIX.replace('_', "\\_")
      ),
    )?;
    Ok(rows.into_iter().map(|r| r[0].clone()).collect())
  }
}

/// Reconstruct a minimal CREATE TABLE from information_schema columns
fn render_table_ddl(name: &str, columns: &[Vec<String>]) -> String {
  let mut lines = Vec::with_capacity(columns.len());
  for col in columns {
    let [column_name, data_type, is_nullable, column_default] = col.as_slice() else {
      continue;
    };
    let mut line = format!("  {} {}", column_name, data_type.to_uppercase());
    if is_nullable == "NO" {
      line.push_str(" NOT NULL");
    }
    if !column_default.is_empty() {
      line.push_str(&format!(" DEFAULT {}", column_default));
    }
    lines.push(line);
  }
  format!("CREATE TABLE {} (\n{}\n);", name, lines.join(",\n"))
}
