//! Output module
//!
//! Record sinks for transformed batches.
//!
//! # Overview
//!
//! This module provides:
//! - `RecordSink` - append-only destination for output batches
//! - `CsvSink` - headerless CSV file, appended to across sessions
//! - `MemorySink` - collects records in memory when no file is given

mod csv;
mod sink;

pub use csv::{format_row, CsvSink};
pub use sink::{MemorySink, RecordSink};
