//! Request executor
//!
//! Performs exactly one GET per call and classifies the result:
//! - 2xx with a well-formed body → [`FetchOutcome::Success`]
//! - the rate-limit status → [`FetchOutcome::RateLimited`]
//! - anything else → [`FetchOutcome::TransportFailure`]

use super::rate_limit::{Throttle, ThrottleConfig};
use crate::error::{Error, Result};
use crate::pagination::{Cursor, Page};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Status code the upstream uses to signal an exhausted credential
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Longest error body kept in an `HttpStatus` error
const MAX_ERROR_BODY: usize = 512;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// Response parsed into a page
    Success(Page),
    /// Upstream rejected the credential's rate budget
    RateLimited,
    /// Network error, unexpected status or malformed body
    TransportFailure(Error),
}

impl FetchOutcome {
    /// Check if this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Check if this is a rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Performs one request against a cursor
///
/// Implementations must not retry: a rate-limit or failure is reported back
/// to the caller as-is.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the page the cursor points at
    async fn execute(&self, cursor: &Cursor) -> FetchOutcome;
}

/// Configuration for the HTTP executor
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Status treated as rate-limited
    pub rate_limit_status: u16,
    /// Optional request pacing
    pub throttle: Option<ThrottleConfig>,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("tag-collector/{}", env!("CARGO_PKG_VERSION")),
            rate_limit_status: RATE_LIMIT_STATUS,
            throttle: None,
        }
    }
}

impl HttpFetcherConfig {
    /// Create a new config builder
    pub fn builder() -> HttpFetcherConfigBuilder {
        HttpFetcherConfigBuilder::default()
    }
}

/// Builder for HTTP executor config
#[derive(Default)]
pub struct HttpFetcherConfigBuilder {
    config: HttpFetcherConfig,
}

impl HttpFetcherConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Override the rate-limit status code
    pub fn rate_limit_status(mut self, status: u16) -> Self {
        self.config.rate_limit_status = status;
        self
    }

    /// Pace requests with a token bucket
    pub fn throttle(mut self, config: ThrottleConfig) -> Self {
        self.config.throttle = Some(config);
        self
    }

    /// Build the config
    pub fn build(self) -> HttpFetcherConfig {
        self.config
    }
}

/// reqwest-backed [`Fetcher`]
pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
    throttle: Option<Throttle>,
}

impl HttpFetcher {
    /// Create an executor with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpFetcherConfig::default())
    }

    /// Create an executor with custom configuration
    pub fn with_config(config: HttpFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let throttle = config.throttle.as_ref().map(Throttle::new);

        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// Check if pacing is enabled
    pub fn has_throttle(&self) -> bool {
        self.throttle.is_some()
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    async fn classify(&self, response: reqwest::Response) -> FetchOutcome {
        let status = response.status();

        if status.as_u16() == self.config.rate_limit_status {
            warn!(status = status.as_u16(), "Rate limit reached for current credential");
            return FetchOutcome::RateLimited;
        }

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return FetchOutcome::TransportFailure(Error::http_status(status.as_u16(), body));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return FetchOutcome::TransportFailure(Error::malformed(format!(
                    "response body is not JSON: {e}"
                )))
            }
        };

        match Page::from_body(&body) {
            Ok(page) => {
                debug!(
                    records = page.len(),
                    has_next = page.has_next(),
                    "Page received"
                );
                FetchOutcome::Success(page)
            }
            Err(e) => FetchOutcome::TransportFailure(e),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn execute(&self, cursor: &Cursor) -> FetchOutcome {
        if let Some(ref throttle) = self.throttle {
            throttle.wait().await;
        }

        // The full URL carries the credential; only log the endpoint
        debug!(endpoint = %cursor.endpoint(), "GET");

        match self.client.get(cursor.to_url()).send().await {
            Ok(response) => self.classify(response).await,
            Err(e) if e.is_timeout() => {
                warn!("Request timed out after {:?}", self.config.timeout);
                FetchOutcome::TransportFailure(Error::transport(format!(
                    "request timed out after {}ms",
                    self.config.timeout.as_millis()
                )))
            }
            Err(e) => {
                warn!("Request failed: {e}");
                FetchOutcome::TransportFailure(Error::Http(e.without_url()))
            }
        }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("config", &self.config)
            .field("has_throttle", &self.throttle.is_some())
            .finish_non_exhaustive()
    }
}
