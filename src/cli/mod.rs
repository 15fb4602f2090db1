//! CLI module
//!
//! Command-line interface for collection runs.
//!
//! # Commands
//!
//! - `collect` - Fetch records for a tag, resuming from the ledger
//! - `status` - Show the progress ledger of a run
//! - `reset` - Delete the progress ledger of a run

mod commands;
mod runner;

pub use commands::{Cli, CollectArgs, Commands, OutputFormat};
pub use runner::Runner;
