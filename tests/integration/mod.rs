//! Integration tests: drive the sqlramp binary against throwaway git repos.
//!
//! Everything here runs without a warehouse; actions that need one are
//! covered by unit tests against the in-memory backend.

mod helpers;
mod test_cli;
mod test_deploy;
mod test_prepare;
mod test_validate;
