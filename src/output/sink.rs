//! Record sink trait and in-memory sink

use crate::error::Result;
use crate::types::{Batch, Record};

/// Append-only destination for output records
///
/// `append` must have handed the batch to durable storage before returning,
/// since the ledger commit that follows treats it as written.
pub trait RecordSink: Send {
    /// Append a batch, preserving order
    fn append(&mut self, batch: &[Record]) -> Result<()>;

    /// Records appended through this sink instance
    fn records_written(&self) -> u64;
}

/// Sink that keeps records in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Batch,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records collected so far
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take the collected records
    pub fn into_records(self) -> Batch {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, batch: &[Record]) -> Result<()> {
        self.records.extend_from_slice(batch);
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records.len() as u64
    }
}
