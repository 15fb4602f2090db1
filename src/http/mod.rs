//! HTTP module
//!
//! Single-shot request executor for the tag endpoint.
//!
//! # Features
//!
//! - **Outcome classification**: every attempt ends as success with a parsed
//!   page, rate-limited, or transport failure
//! - **No retries**: retry policy (rotate credential or abort) belongs to the
//!   engine
//! - **Pacing**: optional token bucket throttle using governor

mod client;
mod rate_limit;

pub use client::{FetchOutcome, Fetcher, HttpFetcher, HttpFetcherConfig, RATE_LIMIT_STATUS};
pub use rate_limit::{Throttle, ThrottleConfig};
