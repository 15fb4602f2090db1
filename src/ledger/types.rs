//! Ledger types
//!
//! The progress record is a small `key: value` text file so it stays easy to
//! inspect by hand.

use crate::error::{Error, Result};
use crate::pagination::Cursor;
use crate::types::timestamp_to_datetime;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

const RECORDS_FETCHED: &str = "records_fetched";
const REQUESTS_ISSUED: &str = "requests_issued";
const ELAPSED_SECONDS: &str = "elapsed_seconds";
const END_OF_RESULTS: &str = "end_of_results";
const TARGET: &str = "target";
const NEXT_URL: &str = "next_url";
const STATUS: &str = "status";
const OLDEST_CREATED_TIME: &str = "oldest_created_time";
const OLDEST_CREATED_AT: &str = "oldest_created_at";
const FINISHED_AT: &str = "finished_at";

// Keys written by the first generation of the tool
const LEGACY_POST_COUNT: &str = "post count";
const LEGACY_REQUESTS: &str = "number of requests";

/// Cumulative counters of a collection run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    /// Records appended to the sink so far
    pub records_fetched: u64,
    /// Successful requests issued so far
    pub requests_issued: u64,
    /// Wall time spent across all sessions of the run
    pub elapsed_seconds: f64,
    /// Upstream reported no further pages
    pub end_of_results: bool,
    /// Record count the run is aiming for
    pub target: Option<u64>,
}

impl Progress {
    /// Create empty progress
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run with target `n` has nothing left to do
    pub fn is_complete(&self, target: u64) -> bool {
        self.records_fetched >= target || self.end_of_results
    }

    /// Records still needed to reach `target`
    pub fn remaining(&self, target: u64) -> u64 {
        target.saturating_sub(self.records_fetched)
    }

    /// Account for one successful request that kept `records` records
    pub fn record_request(&mut self, records: u64) {
        self.records_fetched += records;
        self.requests_issued += 1;
    }

    /// Average records kept per request
    pub fn records_per_request(&self) -> f64 {
        if self.requests_issued == 0 {
            0.0
        } else {
            self.records_fetched as f64 / self.requests_issued as f64
        }
    }

    /// Render the progress record, optionally with the next cursor and a
    /// terminal summary
    pub fn render(&self, next_cursor: Option<&Cursor>, summary: Option<&RunSummary>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{RECORDS_FETCHED}: {}", self.records_fetched);
        let _ = writeln!(out, "{REQUESTS_ISSUED}: {}", self.requests_issued);
        let _ = writeln!(out, "{ELAPSED_SECONDS}: {:.3}", self.elapsed_seconds);
        let _ = writeln!(out, "{END_OF_RESULTS}: {}", self.end_of_results);
        if let Some(target) = self.target {
            let _ = writeln!(out, "{TARGET}: {target}");
        }
        if let Some(cursor) = next_cursor {
            let _ = writeln!(out, "{NEXT_URL}: {cursor}");
        }
        if let Some(summary) = summary {
            let _ = writeln!(out, "{STATUS}: {}", summary.status);
            if let Some(ts) = summary.oldest_created_time {
                let _ = writeln!(out, "{OLDEST_CREATED_TIME}: {ts}");
                if let Some(dt) = timestamp_to_datetime(ts) {
                    let _ = writeln!(
                        out,
                        "{OLDEST_CREATED_AT}: {}",
                        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
                    );
                }
            }
            let _ = writeln!(
                out,
                "{FINISHED_AT}: {}",
                summary.finished_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            );
        }
        out
    }
}

/// Terminal information appended to the progress record when a run ends
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// How the run ended
    pub status: String,
    /// `created_time` of the final record of the last successful response
    pub oldest_created_time: Option<i64>,
    /// When the run ended
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Create a summary stamped with the current time
    pub fn new(status: impl Into<String>, oldest_created_time: Option<i64>) -> Self {
        Self {
            status: status.into(),
            oldest_created_time,
            finished_at: Utc::now(),
        }
    }
}

/// State a run resumes from
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Counters as of the last commit
    pub progress: Progress,
    /// Cursor for the next request, if one was recorded
    pub cursor: Option<Cursor>,
    /// Status written by the last finalize, if any
    pub status: Option<String>,
    /// When the last session finished, if it was finalized
    pub finished_at: Option<String>,
}

impl Checkpoint {
    /// Parse a progress record. `path` is only used in error messages.
    ///
    /// The counters are mandatory; anything missing or unparseable is
    /// reported as corruption rather than silently treated as zero.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut fields = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| {
                Error::ledger_corruption(path, format!("line {} is not 'key: value'", lineno + 1))
            })?;
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        let get = |keys: &[&str]| keys.iter().find_map(|k| fields.get(*k));
        let count = |keys: &[&str]| -> Result<u64> {
            let raw = get(keys)
                .ok_or_else(|| Error::ledger_corruption(path, format!("missing {}", keys[0])))?;
            raw.parse().map_err(|_| {
                Error::ledger_corruption(path, format!("{} is not a count: '{raw}'", keys[0]))
            })
        };

        let records_fetched = count(&[RECORDS_FETCHED, LEGACY_POST_COUNT])?;
        let requests_issued = count(&[REQUESTS_ISSUED, LEGACY_REQUESTS])?;

        let legacy = fields.contains_key(LEGACY_POST_COUNT);
        let elapsed_seconds = match fields.get(ELAPSED_SECONDS) {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| {
                    Error::ledger_corruption(path, format!("{ELAPSED_SECONDS} is invalid: '{raw}'"))
                })?,
            None if legacy => 0.0,
            None => return Err(Error::ledger_corruption(path, format!("missing {ELAPSED_SECONDS}"))),
        };

        let end_of_results = match fields.get(END_OF_RESULTS).map(String::as_str) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(Error::ledger_corruption(
                    path,
                    format!("{END_OF_RESULTS} is not a boolean: '{other}'"),
                ))
            }
        };

        let target = fields
            .get(TARGET)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    Error::ledger_corruption(path, format!("{TARGET} is not a count: '{raw}'"))
                })
            })
            .transpose()?;

        let cursor = fields
            .get(NEXT_URL)
            .map(|raw| {
                Cursor::parse(raw).map_err(|e| {
                    Error::ledger_corruption(path, format!("{NEXT_URL} is not a URL: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            progress: Progress {
                records_fetched,
                requests_issued,
                elapsed_seconds,
                end_of_results,
                target,
            },
            cursor,
            status: fields.get(STATUS).cloned(),
            finished_at: fields.get(FINISHED_AT).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Checkpoint> {
        Checkpoint::parse(text, Path::new("run.log"))
    }

    #[test]
    fn test_progress_counters() {
        let mut progress = Progress::new();
        assert!(!progress.is_complete(10));
        assert_eq!(progress.remaining(10), 10);
        assert_eq!(progress.records_per_request(), 0.0);

        progress.record_request(4);
        progress.record_request(6);
        assert_eq!(progress.records_fetched, 10);
        assert_eq!(progress.requests_issued, 2);
        assert_eq!(progress.remaining(10), 0);
        assert!(progress.is_complete(10));
        assert_eq!(progress.records_per_request(), 5.0);
    }

    #[test]
    fn test_end_of_results_completes_any_target() {
        let progress = Progress {
            records_fetched: 3,
            end_of_results: true,
            ..Progress::default()
        };
        assert!(progress.is_complete(1000));
    }

    #[test]
    fn test_render_and_parse() {
        let progress = Progress {
            records_fetched: 120,
            requests_issued: 3,
            elapsed_seconds: 4.2104,
            end_of_results: false,
            target: Some(500),
        };
        let cursor =
            Cursor::parse("https://example.com/v1/tags/x/media/recent?client_id=k&max_tag_id=9")
                .unwrap();

        let text = progress.render(Some(&cursor), None);
        assert!(text.starts_with(
            "records_fetched: 120\nrequests_issued: 3\nelapsed_seconds: 4.210\nend_of_results: false\ntarget: 500\n"
        ));

        let checkpoint = parse(&text).unwrap();
        assert_eq!(checkpoint.progress.records_fetched, 120);
        assert_eq!(checkpoint.progress.requests_issued, 3);
        assert!((checkpoint.progress.elapsed_seconds - 4.21).abs() < 1e-9);
        assert_eq!(checkpoint.progress.target, Some(500));
        assert_eq!(checkpoint.cursor, Some(cursor));
        assert_eq!(checkpoint.status, None);
    }

    #[test]
    fn test_render_summary_fields_are_tolerated_on_parse() {
        let progress = Progress {
            records_fetched: 5,
            requests_issued: 1,
            ..Progress::default()
        };
        let summary = RunSummary::new("quota_reached", Some(0));
        let text = progress.render(None, Some(&summary));

        assert!(text.contains("status: quota_reached\n"));
        assert!(text.contains("oldest_created_time: 0\n"));
        assert!(text.contains("oldest_created_at: 1970-01-01T00:00:00Z\n"));

        let checkpoint = parse(&text).unwrap();
        assert_eq!(checkpoint.status.as_deref(), Some("quota_reached"));
        assert!(checkpoint.finished_at.is_some());
        assert_eq!(checkpoint.progress.records_fetched, 5);
    }

    #[test]
    fn test_parse_legacy_format() {
        let checkpoint = parse("post count: 80\nnumber of requests: 2").unwrap();
        assert_eq!(checkpoint.progress.records_fetched, 80);
        assert_eq!(checkpoint.progress.requests_issued, 2);
        assert_eq!(checkpoint.progress.elapsed_seconds, 0.0);
    }

    #[test]
    fn test_parse_rejects_corruption() {
        for text in [
            "",
            "records_fetched: 10\n",
            "records_fetched: 10\nrequests_issued: 1\n",
            "records_fetched: ten\nrequests_issued: 1\nelapsed_seconds: 1.0\n",
            "records_fetched: 10\nrequests_issued: 1\nelapsed_seconds: -1\n",
            "records_fetched: 10\nrequests_issued: 1\nelapsed_seconds: 1.0\nend_of_results: maybe\n",
            "records_fetched: 10\nrequests_issued: 1\nelapsed_sec",
            "records_fetched: 10\nrequests_issued: 1\nelapsed_seconds: 1\nnext_url: ::::\n",
        ] {
            let err = parse(text).unwrap_err();
            assert!(
                matches!(err, Error::LedgerCorruption { .. }),
                "expected corruption for {text:?}, got {err}"
            );
        }
    }
}
