//! Progress ledger module
//!
//! Durable progress for resumable collection runs.
//!
//! # Overview
//!
//! The ledger provides:
//! - `Progress` - cumulative counters of a run
//! - `Ledger` - file-backed persistence next to the output file
//! - `Checkpoint` - what a resumed run starts from
//!
//! For an output file `posts.csv` the ledger lives in `posts.log` (progress,
//! rewritten atomically on each commit) and `posts_url.log` (append-only log
//! of every cursor the run requested).

mod manager;
mod types;

pub use manager::Ledger;
pub use types::{Checkpoint, Progress, RunSummary};

#[cfg(test)]
mod manager_tests;
