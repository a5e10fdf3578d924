//! CLI commands for sqlramp
//!
//! One module per user-facing action:
//!
//! - **prepare**: build the release candidate from classified changes
//! - **deploy**: finalize and execute the candidate, record the release
//! - **validate**: parse every model file into object metadata
//! - **history**: print the release ledger
//! - **clone**: clone production into the branch database
//! - **sync**: replay committed releases the ledger has not seen (+ test-sync)
//! - **compare**: model tree vs. live catalog (whole tree or one file)
//! - **stale**: development clones whose branches are gone
//!
//! All commands accept `&ReleaseContext` to avoid redundant loads.

pub mod clone;
pub mod compare;
pub mod deploy;
pub mod history;
pub mod prepare;
pub mod stale;
pub mod sync;
pub mod validate;

pub use clone::run_clone;
pub use compare::{run_compare, run_diff};
pub use deploy::run_deploy;
pub use history::run_history;
pub use prepare::run_prepare;
pub use stale::run_list_stale_branches;
pub use sync::{run_sync, run_test_sync};
pub use validate::run_validate;
