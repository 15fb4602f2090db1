//! Ledger persistence
//!
//! Provides file-based progress persistence with atomic writes.

use super::types::{Checkpoint, Progress, RunSummary};
use crate::error::{Error, Result};
use crate::pagination::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Durable progress record of one collection run
///
/// A run is identified by its output file; the ledger files are derived from
/// it deterministically. An in-memory ledger (no output file) persists
/// nothing and always starts fresh.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Progress record, rewritten on each commit
    progress_path: Option<PathBuf>,
    /// Append-only log of cursors
    cursor_log_path: Option<PathBuf>,
}

impl Ledger {
    /// Ledger for the run writing to `output`.
    ///
    /// `out.csv` maps to `out.log` and `out_url.log` in the same directory.
    pub fn for_output(output: impl AsRef<Path>) -> Result<Self> {
        let output = output.as_ref();
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::config(format!("Output path has no file name: {}", output.display()))
            })?;

        let progress_path = output.with_file_name(format!("{stem}.log"));
        let cursor_log_path = output.with_file_name(format!("{stem}_url.log"));

        if progress_path == output || cursor_log_path == output {
            return Err(Error::config(format!(
                "Output file '{}' would collide with its own progress ledger",
                output.display()
            )));
        }

        Ok(Self {
            progress_path: Some(progress_path),
            cursor_log_path: Some(cursor_log_path),
        })
    }

    /// Ledger that keeps nothing on disk
    pub fn in_memory() -> Self {
        Self {
            progress_path: None,
            cursor_log_path: None,
        }
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.progress_path.is_none()
    }

    /// Path of the progress record
    pub fn progress_path(&self) -> Option<&Path> {
        self.progress_path.as_deref()
    }

    /// Path of the cursor log
    pub fn cursor_log_path(&self) -> Option<&Path> {
        self.cursor_log_path.as_deref()
    }

    /// Load prior progress.
    ///
    /// Returns `None` when no progress record exists. A record that cannot be
    /// parsed is an error: restarting from zero would re-download everything.
    /// If the record has no cursor, the last line of the cursor log is used,
    /// unless the run reached the end of results and has nothing left to
    /// fetch.
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        let Some(path) = self.progress_path.as_deref() else {
            return Ok(None);
        };

        let temp_path = temp_path_for(path);
        if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
            warn!(
                "Ignoring interrupted ledger write at {}",
                temp_path.display()
            );
        }

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(log) = self.cursor_log_path.as_deref() {
                    if tokio::fs::try_exists(log).await.unwrap_or(false) {
                        warn!(
                            "Cursor log {} exists without a progress record; starting fresh",
                            log.display()
                        );
                    }
                }
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::ledger(format!(
                    "Failed to read progress file {}: {e}",
                    path.display()
                )))
            }
        };

        let mut checkpoint = Checkpoint::parse(&contents, path)?;
        if checkpoint.progress.end_of_results {
            checkpoint.cursor = None;
        } else if checkpoint.cursor.is_none() {
            checkpoint.cursor = self.last_logged_cursor().await?;
        }

        debug!(
            records = checkpoint.progress.records_fetched,
            requests = checkpoint.progress.requests_issued,
            has_cursor = checkpoint.cursor.is_some(),
            "Loaded ledger from {}",
            path.display()
        );

        Ok(Some(checkpoint))
    }

    /// Last cursor in the cursor log, if any
    pub async fn last_logged_cursor(&self) -> Result<Option<Cursor>> {
        let Some(log) = self.cursor_log_path.as_deref() else {
            return Ok(None);
        };

        let contents = match tokio::fs::read_to_string(log).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::ledger(format!(
                    "Failed to read cursor log {}: {e}",
                    log.display()
                )))
            }
        };

        contents
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| {
                Cursor::parse(line).map_err(|e| {
                    Error::ledger_corruption(log, format!("last cursor is not a URL: {e}"))
                })
            })
            .transpose()
    }

    /// Append a cursor the run is about to use to the cursor log.
    ///
    /// Covers cursors that no commit records: the initial one and those
    /// re-issued with a rotated credential.
    pub async fn log_cursor(&self, cursor: &Cursor) -> Result<()> {
        match self.cursor_log_path.as_deref() {
            Some(log) => append_line(log, &cursor.to_string()).await,
            None => Ok(()),
        }
    }

    /// Persist progress after a request.
    ///
    /// The next cursor (if any) is appended to the cursor log first, then the
    /// progress record is replaced atomically.
    pub async fn commit(&self, progress: &Progress, next_cursor: Option<&Cursor>) -> Result<()> {
        let Some(path) = self.progress_path.as_deref() else {
            return Ok(());
        };

        if let (Some(log), Some(cursor)) = (self.cursor_log_path.as_deref(), next_cursor) {
            append_line(log, &cursor.to_string()).await?;
        }

        write_atomic(path, &progress.render(next_cursor, None)).await
    }

    /// Rewrite the progress record with a terminal summary.
    ///
    /// Callers may ignore the error: committed progress stays valid either
    /// way.
    pub async fn finalize(
        &self,
        progress: &Progress,
        next_cursor: Option<&Cursor>,
        summary: &RunSummary,
    ) -> Result<()> {
        let Some(path) = self.progress_path.as_deref() else {
            return Ok(());
        };
        write_atomic(path, &progress.render(next_cursor, Some(summary))).await
    }

    /// Delete the progress record and cursor log
    pub async fn reset(&self) -> Result<()> {
        for path in [self.progress_path.as_deref(), self.cursor_log_path.as_deref()]
            .into_iter()
            .flatten()
        {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::ledger(format!(
                        "Failed to remove {}: {e}",
                        path.display()
                    )))
                }
            }
        }
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write to a temp file first, then rename for atomicity
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = temp_path_for(path);

    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .map_err(|e| Error::ledger(format!("Failed to write progress file: {e}")))?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| Error::ledger(format!("Failed to write progress file: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| Error::ledger(format!("Failed to sync progress file: {e}")))?;
    drop(file);

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::ledger(format!("Failed to rename progress file: {e}")))
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| Error::ledger(format!("Failed to open cursor log: {e}")))?;
    file.write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(|e| Error::ledger(format!("Failed to append to cursor log: {e}")))?;
    file.flush()
        .await
        .map_err(|e| Error::ledger(format!("Failed to flush cursor log: {e}")))
}
