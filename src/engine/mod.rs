//! Pagination engine module
//!
//! Main fetch loop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Collector` - drives one collection run to its target count
//! - `EngineConfig` - what to collect
//! - `RunReport` - counters and termination reason
//!
//! One request is in flight at a time. Each successful response is
//! transformed, truncated to the remaining quota, appended to the sink and
//! committed to the ledger before the next request is made.

mod types;

pub use types::{EngineConfig, Phase, RunReport, Termination, DEFAULT_PAGE_SIZE};

use crate::credentials::CredentialPool;
use crate::error::{Error, Result};
use crate::http::{FetchOutcome, Fetcher};
use crate::ledger::{Ledger, Progress, RunSummary};
use crate::output::RecordSink;
use crate::pagination::{Cursor, Page};
use crate::transform::{Identity, Transform};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Resumable, rate-limit-aware collector for one run
pub struct Collector {
    /// What to collect
    config: EngineConfig,
    /// Credentials, owned for the duration of the run
    pool: CredentialPool,
    /// Durable progress
    ledger: Ledger,
    /// Raw batch → output batch
    transform: Box<dyn Transform>,
    /// Checked once per iteration
    cancel: CancellationToken,
    /// Current state machine phase
    phase: Phase,
}

impl Collector {
    /// Create a collector. Validates the config; performs no I/O.
    pub fn new(config: EngineConfig, pool: CredentialPool, ledger: Ledger) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool,
            ledger,
            transform: Box::new(Identity),
            cancel: CancellationToken::new(),
            phase: Phase::Idle,
        })
    }

    /// Set the transform
    #[must_use]
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Set an already boxed transform
    #[must_use]
    pub fn with_boxed_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    /// Stop at the next iteration boundary once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the credential pool
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Get the ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            debug!(from = ?self.phase, to = ?next, "Phase change");
            self.phase = next;
        }
    }

    /// Run until the target is reached, upstream runs dry, credentials are
    /// exhausted, a request fails or cancellation is requested.
    ///
    /// Request failures and rate-limit exhaustion are reported through
    /// [`RunReport::termination`]. `Err` is returned for ledger corruption and
    /// for sink or ledger write failures; progress committed before the
    /// failure stays valid.
    pub async fn run(
        &mut self,
        fetcher: &dyn Fetcher,
        sink: &mut dyn RecordSink,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let target = self.config.target;
        self.transition(Phase::Idle);

        let checkpoint = self.ledger.load().await?;
        let (mut progress, resumed_cursor) = match checkpoint {
            Some(checkpoint) => (checkpoint.progress, checkpoint.cursor),
            None => (Progress::new(), None),
        };

        if progress.is_complete(target) {
            info!(
                records = progress.records_fetched,
                target,
                end_of_results = progress.end_of_results,
                "Run already complete; nothing to fetch"
            );
            self.transition(Phase::Done);
            return Ok(RunReport {
                progress,
                termination: Termination::AlreadyComplete,
                session_requests: 0,
                session_records: 0,
                rotations: 0,
                oldest_created_time: None,
                cursor: resumed_cursor,
            });
        }
        progress.target = Some(target);

        let mut cursor = match resumed_cursor {
            Some(mut cursor) => {
                cursor.set_credential(self.pool.current());
                info!(
                    records = progress.records_fetched,
                    requests = progress.requests_issued,
                    "Resuming run"
                );
                cursor
            }
            None if progress.requests_issued > 0 => {
                return Err(Error::ledger_corruption(
                    self.ledger.progress_path().unwrap_or_else(|| Path::new("")),
                    format!(
                        "{} requests recorded but no cursor to resume from",
                        progress.requests_issued
                    ),
                ));
            }
            None => {
                let cursor = Cursor::initial(
                    &self.config.base_url,
                    &self.config.tag,
                    self.pool.current(),
                    self.config.page_size,
                    &self.config.extra_params,
                )?;
                self.ledger.log_cursor(&cursor).await?;
                cursor
            }
        };

        let prior_elapsed = progress.elapsed_seconds;
        let mut session_requests = 0u64;
        let mut session_records = 0u64;
        let mut rotations = 0u32;
        let mut rotations_since_success = 0usize;
        let mut oldest_created_time = None;

        let termination = loop {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested; stopping");
                break Termination::Cancelled;
            }

            self.transition(Phase::Fetching);
            info!(
                "got {}/{} records, now using URL: .../{}",
                progress.records_fetched,
                target,
                cursor.short_display()
            );

            match fetcher.execute(&cursor).await {
                FetchOutcome::Success(page) => {
                    self.transition(Phase::Draining);
                    rotations_since_success = 0;
                    if let Some(ts) = page.last_created_time() {
                        oldest_created_time = Some(ts);
                    }

                    let Page {
                        records,
                        next_cursor,
                    } = page;
                    let raw_count = records.len();
                    let mut batch = self.transform.apply(records);

                    let remaining =
                        usize::try_from(progress.remaining(target)).unwrap_or(usize::MAX);
                    if batch.len() > remaining {
                        debug!(
                            kept = remaining,
                            dropped = batch.len() - remaining,
                            "Truncating batch to remaining quota"
                        );
                        batch.truncate(remaining);
                    }

                    sink.append(&batch)?;

                    let kept = batch.len() as u64;
                    progress.record_request(kept);
                    progress.elapsed_seconds = prior_elapsed + started.elapsed().as_secs_f64();
                    progress.end_of_results = next_cursor.is_none();
                    session_requests += 1;
                    session_records += kept;

                    let next_cursor = next_cursor.map(|mut next| {
                        next.set_credential(self.pool.current());
                        next
                    });
                    self.ledger.commit(&progress, next_cursor.as_ref()).await?;

                    debug!(raw = raw_count, kept, "Batch committed");

                    if let Some(next) = next_cursor {
                        cursor = next;
                    }
                    if progress.records_fetched >= target {
                        break Termination::QuotaReached;
                    }
                    if progress.end_of_results {
                        info!("Upstream has no more results");
                        break Termination::EndOfResults;
                    }
                }
                FetchOutcome::RateLimited => {
                    if rotations_since_success + 1 < self.pool.len() {
                        self.transition(Phase::RotatingCredential);
                        let Some(next) = self.pool.rotate() else {
                            break Termination::RateLimited;
                        };
                        warn!("Rate limited; rotating to credential {next}");
                        cursor.set_credential(next);
                        self.ledger.log_cursor(&cursor).await?;
                        rotations_since_success += 1;
                        rotations += 1;
                    } else {
                        warn!(
                            credentials = self.pool.len(),
                            "API limit reached on every credential"
                        );
                        break Termination::RateLimited;
                    }
                }
                FetchOutcome::TransportFailure(e) => {
                    error!("Request failed: {e}");
                    break Termination::TransportFailure(e);
                }
            }
        };

        progress.elapsed_seconds = prior_elapsed + started.elapsed().as_secs_f64();
        self.transition(termination.phase());

        // A consumed cursor at end of results is not a place to resume from
        let next_cursor = (!progress.end_of_results).then_some(cursor);

        let summary = RunSummary::new(termination.as_str(), oldest_created_time);
        if let Err(e) = self
            .ledger
            .finalize(&progress, next_cursor.as_ref(), &summary)
            .await
        {
            warn!("Failed to finalize ledger: {e}");
        }

        info!(
            "Done requesting {} records in {} requests ({:.2} per request), took {:.2}s [{}]",
            progress.records_fetched,
            progress.requests_issued,
            progress.records_per_request(),
            progress.elapsed_seconds,
            termination.as_str()
        );

        Ok(RunReport {
            progress,
            termination,
            session_requests,
            session_records,
            rotations,
            oldest_created_time,
            cursor: next_cursor,
        })
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("ledger", &self.ledger)
            .field("transform", &self.transform.name())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
