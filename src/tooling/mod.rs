//! Tooling & Integration Layer
//!
//! Command-line surface over the sync engine. Commands are idempotent: running
//! `sync` twice against an unchanged document downloads and regenerates nothing.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
