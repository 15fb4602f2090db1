//! Engine types
//!
//! Configuration, state machine phases and the report of a collection run.

use crate::error::{Error, Result};
use crate::ledger::Progress;
use crate::pagination::{Cursor, DEFAULT_BASE_URL};
use crate::types::timestamp_to_datetime;
use chrono::{DateTime, Utc};

/// Default records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 40;

/// What to collect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hashtag to search
    pub tag: String,
    /// Records to collect in total
    pub target: u64,
    /// Records requested per page
    pub page_size: u32,
    /// API root
    pub base_url: String,
    /// Extra query parameters for the first request
    pub extra_params: Vec<(String, String)>,
}

impl EngineConfig {
    /// Collect `target` records tagged `tag`
    pub fn new(tag: impl Into<String>, target: u64) -> Self {
        Self {
            tag: tag.into(),
            target,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: DEFAULT_BASE_URL.to_string(),
            extra_params: Vec::new(),
        }
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Add an extra query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Check the config without touching the network or disk
    pub fn validate(&self) -> Result<()> {
        if self.target == 0 {
            return Err(Error::config("Record count must be positive"));
        }
        if self.page_size == 0 {
            return Err(Error::config("Page size must be positive"));
        }
        Cursor::tag_endpoint(&self.base_url, &self.tag)?;
        Ok(())
    }
}

/// Engine state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started, or loading the ledger
    Idle,
    /// Waiting for a response
    Fetching,
    /// Switching to the next credential after a rate-limit
    RotatingCredential,
    /// Writing a received batch and committing progress
    Draining,
    /// Finished normally
    Done,
    /// Stopped early
    Aborted,
}

impl Phase {
    /// Whether the phase is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Why a run stopped
#[derive(Debug)]
pub enum Termination {
    /// Target record count reached
    QuotaReached,
    /// Upstream has no more pages
    EndOfResults,
    /// Ledger already showed the run as finished; nothing was requested
    AlreadyComplete,
    /// Every credential is rate-limited
    RateLimited,
    /// Cancellation was requested
    Cancelled,
    /// A request failed
    TransportFailure(Error),
}

impl Termination {
    /// Status string written to the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaReached => "quota_reached",
            Self::EndOfResults => "end_of_results",
            Self::AlreadyComplete => "already_complete",
            Self::RateLimited => "rate_limited",
            Self::Cancelled => "cancelled",
            Self::TransportFailure(_) => "transport_failure",
        }
    }

    /// Terminal phase this reason maps to
    pub fn phase(&self) -> Phase {
        match self {
            Self::QuotaReached | Self::EndOfResults | Self::AlreadyComplete => Phase::Done,
            Self::RateLimited | Self::Cancelled | Self::TransportFailure(_) => Phase::Aborted,
        }
    }

    /// Whether the run finished without needing another session
    pub fn is_done(&self) -> bool {
        self.phase() == Phase::Done
    }

    /// Whether the run ended on an error
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }

    /// Cause of a transport failure
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::TransportFailure(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of a collection run
#[derive(Debug)]
pub struct RunReport {
    /// Cumulative counters, including earlier sessions
    pub progress: Progress,
    /// Why the run stopped
    pub termination: Termination,
    /// Requests issued by this session
    pub session_requests: u64,
    /// Records written by this session
    pub session_records: u64,
    /// Credential rotations in this session
    pub rotations: u32,
    /// `created_time` of the final record of the last successful response
    pub oldest_created_time: Option<i64>,
    /// Cursor the next session would continue from; `None` at end of results
    pub cursor: Option<Cursor>,
}

impl RunReport {
    /// Oldest timestamp as a datetime
    pub fn oldest_created_at(&self) -> Option<DateTime<Utc>> {
        self.oldest_created_time.and_then(timestamp_to_datetime)
    }

    /// Terminal phase of the run
    pub fn phase(&self) -> Phase {
        self.termination.phase()
    }
}
