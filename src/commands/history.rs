use crate::core::context::ReleaseContext;
use crate::core::error::RampResult;
use crate::core::ledger::{Ledger, SqlLedger};

/// Print the release ledger
pub fn run_history(ctx: &ReleaseContext, json: bool) -> RampResult<()> {
  if !json {
    println!("🗒  Release history");
  }

  let (backend, applied_by) = ctx.backend()?;
  let ledger = SqlLedger::new(&backend, ctx.config.ledger.table.clone(), applied_by.clone());
  let entries = ledger.history(&ctx.target()?)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&entries)?);
    return Ok(());
  }

  println!(
    "|{:_^13}|{:_^32}|{:_^22}|{:_^18}|{:_^12}|{:_^6}|",
    "commit hash", "file name", "applied by", "applied on", "branch", "prod"
  );
  for entry in entries {
    println!(
      "| {:>10.10}  | {:<30.30} | {:^20.20} | {:^16} | {:^10.10} | {:^4} |",
      entry.commit_hash,
      tail(&entry.filename, 30),
      entry.applied_by,
      entry.applied_on.format("%Y-%m-%d %H:%M"),
      entry.branch,
      if entry.is_production { "•" } else { "" }
    );
  }
  Ok(())
}

/// Last `n` characters of a string (char-safe)
pub fn tail(s: &str, n: usize) -> &str {
  let count = s.chars().count();
  if count <= n {
    return s;
  }
  let (idx, _) = s.char_indices().nth(count - n).unwrap_or((0, ' '));
  &s[idx..]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tail_keeps_short_strings() {
    assert_eq!(tail("releases/main.sql", 30), "releases/main.sql");
  }

  #[test]
  fn test_tail_truncates_from_the_left() {
    assert_eq!(tail("releases/very/long/path/to/release_file.sql", 10), "e_file.sql");
  }
}
