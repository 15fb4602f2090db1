//! Request pacing
//!
//! Uses the governor crate for token bucket pacing. Pacing only spaces
//! requests out; it never retries or rotates credentials.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for request pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Requests allowed per period
    pub requests: u32,
    /// Length of the period in seconds
    pub period_secs: u64,
    /// Burst size (max tokens in bucket)
    pub burst: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::per_hour(5000)
    }
}

impl ThrottleConfig {
    /// Allow `requests` per hour, no burst
    pub fn per_hour(requests: u32) -> Self {
        Self {
            requests,
            period_secs: 3600,
            burst: 1,
        }
    }

    /// Allow `requests` per second with an equal burst
    pub fn per_second(requests: u32) -> Self {
        Self {
            requests,
            period_secs: 1,
            burst: requests,
        }
    }

    fn quota(&self) -> Quota {
        let requests = NonZeroU32::new(self.requests).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_secs(self.period_secs.max(1)) / requests.get();
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(requests))
            .allow_burst(burst)
    }
}

/// Token bucket throttle
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl Throttle {
    /// Create a throttle with the given config
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            limiter: Arc::new(Governor::direct(config.quota())),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_throttle_config_presets() {
        let hourly = ThrottleConfig::per_hour(5000);
        assert_eq!(hourly.requests, 5000);
        assert_eq!(hourly.period_secs, 3600);
        assert_eq!(hourly.burst, 1);

        let fast = ThrottleConfig::per_second(10);
        assert_eq!(fast.burst, 10);
        assert_eq!(ThrottleConfig::default(), ThrottleConfig::per_hour(5000));
    }

    #[test]
    fn test_throttle_burst_then_blocks() {
        let throttle = Throttle::new(&ThrottleConfig {
            requests: 1,
            period_secs: 3600,
            burst: 2,
        });

        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn test_zero_values_fall_back_to_one() {
        let throttle = Throttle::new(&ThrottleConfig {
            requests: 0,
            period_secs: 0,
            burst: 0,
        });
        assert!(throttle.try_acquire());
    }

    #[tokio::test]
    async fn test_throttle_wait_within_burst() {
        let throttle = Throttle::new(&ThrottleConfig::per_second(100));
        throttle.wait().await;
    }
}
