//! Statement splitting, comment stripping, colored printing, and diffs.
//!
//! Tokenization rides on sqlparser's Postgres dialect (dollar-quoted bodies,
//! standard string/comment rules); nothing here validates or rewrites SQL.

use anstyle::{AnsiColor, Color, Style};
use log::warn;
use similar::TextDiff;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Split SQL into statements, stripping comments.
///
/// An empty slot in the result marks a statement that was nothing but
/// comments or stray separators; the executor downgrades those to a warning
/// instead of aborting the batch.
pub fn split_statements(sql: &str) -> Vec<String> {
  let dialect = PostgreSqlDialect {};
  let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
    Ok(tokens) => tokens,
    Err(e) => {
      warn!("SQL tokenization failed ({}); executing as a single statement", e);
      let trimmed = sql.trim();
      return if trimmed.is_empty() {
        vec![]
      } else {
        vec![trimmed.to_string()]
      };
    }
  };

  let mut statements = Vec::new();
  let mut current = String::new();

  for token in tokens {
    match token {
      Token::SemiColon => {
        statements.push(current.trim().to_string());
        current.clear();
      }
      Token::Whitespace(Whitespace::SingleLineComment { .. }) => current.push('\n'),
      Token::Whitespace(Whitespace::MultiLineComment(_)) => current.push(' '),
      other => current.push_str(&other.to_string()),
    }
  }

  if !current.trim().is_empty() {
    statements.push(current.trim().to_string());
  }

  statements
}

/// Strip comments from SQL, leaving statements otherwise untouched
pub fn strip_comments(sql: &str) -> String {
  let dialect = PostgreSqlDialect {};
  let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
    Ok(tokens) => tokens,
    Err(_) => return sql.to_string(),
  };

  let mut out = String::new();
  for token in tokens {
    match token {
      Token::Whitespace(Whitespace::SingleLineComment { .. }) => out.push('\n'),
      Token::Whitespace(Whitespace::MultiLineComment(_)) => out.push(' '),
      other => out.push_str(&other.to_string()),
    }
  }
  out.trim().to_string()
}

const COMMENT_STYLE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).dimmed();
const KEYWORD_STYLE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));

/// Pretty-print SQL to stdout with colored keywords and comments
pub fn print_sql(sql: &str) {
  let dialect = PostgreSqlDialect {};
  let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
    Ok(tokens) => tokens,
    Err(_) => {
      println!("{}", sql);
      return;
    }
  };

  for token in tokens {
    match &token {
      Token::Whitespace(Whitespace::SingleLineComment { .. }) | Token::Whitespace(Whitespace::MultiLineComment(_)) => {
        print!("{}{}{}", COMMENT_STYLE.render(), token, COMMENT_STYLE.render_reset());
      }
      Token::Word(word) if word.keyword != Keyword::NoKeyword => {
        print!(
          "{}{}{}",
          KEYWORD_STYLE.render(),
          word.value.to_uppercase(),
          KEYWORD_STYLE.render_reset()
        );
      }
      other => print!("{}", other),
    }
  }
  println!();
}

/// Unified diff of two SQL texts (comments stripped first), with headers
pub fn unified_diff(left: &str, right: &str, from_label: &str, to_label: &str) -> String {
  let left = format!("{}\n", strip_comments(left));
  let right = format!("{}\n", strip_comments(right));

  TextDiff::from_lines(&left, &right)
    .unified_diff()
    .context_radius(0)
    .header(from_label, to_label)
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_two_statements() {
    let stmts = split_statements("CREATE VIEW v AS SELECT 1;\nGRANT SELECT ON v TO analyst;");
    assert_eq!(stmts.len(), 2);
    assert!(stmts[0].starts_with("CREATE VIEW"));
    assert!(stmts[1].starts_with("GRANT"));
  }

  #[test]
  fn test_split_strips_comments() {
    let stmts = split_statements("-- header comment\nSELECT 1; /* inline */ SELECT 2;");
    assert_eq!(stmts.len(), 2);
    assert!(!stmts[0].contains("header"));
    assert!(!stmts[1].contains("inline"));
  }

  #[test]
  fn test_split_marks_empty_statements() {
    let stmts = split_statements("SELECT 1;;SELECT 2;");
    assert_eq!(stmts.len(), 3);
    assert!(stmts[1].is_empty());
  }

  #[test]
  fn test_split_comment_only_input() {
    let stmts = split_statements("-- nothing to run\n");
    assert!(stmts.is_empty());
  }

  #[test]
  fn test_strip_comments_keeps_statement() {
    let out = strip_comments("-- note\nSELECT 1 -- trailing\n");
    assert!(out.contains("SELECT 1"));
    assert!(!out.contains("note"));
    assert!(!out.contains("trailing"));
  }

  #[test]
  fn test_unified_diff_names_labels() {
    let diff = unified_diff(
      "CREATE TABLE t (id INT);",
      "CREATE TABLE t (id INT, region TEXT);",
      "live definition",
      "model/tables/t.sql",
    );
    assert!(diff.contains("--- live definition"));
    assert!(diff.contains("+++ model/tables/t.sql"));
    assert!(diff.contains("+CREATE TABLE t (id INT, region TEXT);"));
  }

  #[test]
  fn test_unified_diff_empty_when_equal() {
    let diff = unified_diff("SELECT 1;", "SELECT 1;", "a", "b");
    assert!(!diff.contains('@'));
  }
}
