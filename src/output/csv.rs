//! CSV file sink
//!
//! Rows are appended without a header so that a resumed run continues the
//! same file.

use super::sink::RecordSink;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Headerless CSV sink opened in append mode
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    file: File,
    delimiter: char,
    rows_written: u64,
}

impl CsvSink {
    /// Open (or create) the file for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                Error::output(format!("Failed to open {}: {e}", path.display()))
            })?;

        Ok(Self {
            path,
            file,
            delimiter: ',',
            rows_written: 0,
        })
    }

    /// Use a different field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, batch: &[Record]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in batch {
            buf.push_str(&format_row(record, self.delimiter));
            buf.push('\n');
        }

        self.file
            .write_all(buf.as_bytes())
            .and_then(|()| self.file.sync_data())
            .map_err(|e| {
                Error::output(format!("Failed to append to {}: {e}", self.path.display()))
            })?;

        self.rows_written += batch.len() as u64;
        debug!(rows = batch.len(), "Appended rows to {}", self.path.display());
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.rows_written
    }
}

/// Render one record as a CSV row (without line terminator).
///
/// Arrays give one column per element. Anything else, objects included, is
/// a single column: raw records do not share a key set, so spreading their
/// values would misalign columns between rows.
pub fn format_row(record: &Record, delimiter: char) -> String {
    match record {
        JsonValue::Array(items) => items
            .iter()
            .map(|v| format_field(v, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string()),
        other => format_field(other, delimiter),
    }
}

fn format_field(value: &JsonValue, delimiter: char) -> String {
    let raw = match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };

    if raw.contains(delimiter) || raw.contains(['"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw
    }
}
