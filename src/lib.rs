// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tag-collector
//!
//! Resumable, rate-limit-aware collector for paginated hashtag media search
//! endpoints.
//!
//! ## Features
//!
//! - **Cursor pagination**: follows `pagination.next_url` until the target
//!   record count is reached or upstream runs dry
//! - **Credential rotation**: a rate-limited credential is swapped for the
//!   next one in a FIFO pool without losing the page position
//! - **Resumable runs**: counters and the next cursor are committed after
//!   every request, so an interrupted run continues where it stopped
//! - **Transforms**: raw records or built-in column projections, or any
//!   closure over a batch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tag_collector::credentials::CredentialPool;
//! use tag_collector::engine::{Collector, EngineConfig};
//! use tag_collector::http::HttpFetcher;
//! use tag_collector::ledger::Ledger;
//! use tag_collector::output::CsvSink;
//!
//! #[tokio::main]
//! async fn main() -> tag_collector::Result<()> {
//!     let pool = CredentialPool::from_keyfile("keys.csv")?;
//!     let ledger = Ledger::for_output("sunset.csv")?;
//!     let mut collector = Collector::new(EngineConfig::new("sunset", 1000), pool, ledger)?;
//!
//!     let fetcher = HttpFetcher::new()?;
//!     let mut sink = CsvSink::open("sunset.csv")?;
//!     let report = collector.run(&fetcher, &mut sink).await?;
//!     println!("{} records", report.progress.records_fetched);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Collector                            │
//! │   Idle → Fetching → Draining → … → Done | Aborted            │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────┬───┴─────────┬───────────┬─────────┐
//! │ Credentials│    HTTP     │ Pagination  │  Ledger   │ Output  │
//! ├────────────┼─────────────┼─────────────┼───────────┼─────────┤
//! │ FIFO pool  │ one GET     │ Cursor      │ out.log   │ CSV     │
//! │ key file   │ 429 → limit │ Page        │ url log   │ memory  │
//! └────────────┴─────────────┴─────────────┴───────────┴─────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the collector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential validation and rotation
pub mod credentials;

/// Single-shot HTTP executor and request pacing
pub mod http;

/// Cursors and response pages
pub mod pagination;

/// Durable progress ledger
pub mod ledger;

/// Record sinks
pub mod output;

/// Record transforms
pub mod transform;

/// Main fetch loop
pub mod engine;

/// Run configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::CollectorConfig;
pub use credentials::{Credential, CredentialPool};
pub use engine::{Collector, EngineConfig, Phase, RunReport, Termination};
pub use http::{FetchOutcome, Fetcher, HttpFetcher};
pub use ledger::Ledger;
pub use output::{CsvSink, MemorySink, RecordSink};
pub use pagination::{Cursor, Page};
pub use transform::{Transform, TransformKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
