//! Core engine for sqlramp operations
//!
//! This module contains the fundamental building blocks of the release
//! lifecycle:
//!
//! - **config**: project (sqlramp.toml) and user connection configuration
//! - **context**: unified per-invocation context for collaborator sharing
//! - **error**: comprehensive error types with contextual help messages
//! - **classify**: change classification into deployable vs. manual-review
//! - **candidate**: release candidate format, integrity token, and builder
//! - **release**: finalization, pinning, and release persistence
//! - **sync**: replay of committed releases the ledger has not seen
//! - **ledger**: release ledger collaborator boundary
//! - **vcs**: git operations abstraction (SystemGit)

pub mod candidate;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod ledger;
pub mod release;
pub mod sync;
pub mod vcs;

#[cfg(test)]
pub mod testutil;
