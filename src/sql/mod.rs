//! SQL text boundary: object metadata extraction, statement splitting,
//! colored printing, and diff rendering.
//!
//! The release engine never manipulates SQL ASTs; this module only derives
//! the metadata the classifier consumes and prepares statement batches for
//! the execution backend.

pub mod meta;
pub mod text;

pub use meta::{ObjectMetadata, is_resume_task, is_sql_file};
pub use text::{print_sql, split_statements, strip_comments, unified_diff};
