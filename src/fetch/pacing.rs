//! Randomized delays
//!
//! All sleeps of a harvest (politeness pacing, render settling, backoff)
//! are drawn from configured ranges so a test configuration can zero them.

use crate::config::PacingConfig;
use rand::Rng;
use std::time::Duration;

/// An inclusive range of durations a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// A range that never sleeps
    pub const ZERO: DelayRange = DelayRange {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Creates a range from whole seconds; the bounds are swapped if reversed
    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that always yields the same duration
    pub fn fixed(duration: Duration) -> Self {
        Self::new(duration, duration)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a duration uniformly from the range (millisecond resolution)
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }
}

/// Sleeps for a duration drawn from `range`
pub async fn pause(range: DelayRange) -> Duration {
    let delay = range.sample();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    delay
}

/// Pacing applied by the catalog revealer and the harvest aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wait before each reveal click
    pub reveal: DelayRange,
    /// Politeness wait before each detail request
    pub before_request: DelayRange,
    /// Fixed wait after each successful extraction
    pub after_request: Duration,
    /// Base wait after a skipped link
    pub after_skip: DelayRange,
    /// Added to the skip wait once per link skipped so far
    pub skip_penalty: Duration,
}

impl Pacing {
    /// Builds pacing from configuration
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            reveal: DelayRange::from_secs(config.reveal_delay_secs.0, config.reveal_delay_secs.1),
            before_request: DelayRange::from_secs(
                config.request_delay_secs.0,
                config.request_delay_secs.1,
            ),
            after_request: Duration::from_millis(config.post_request_delay_ms),
            after_skip: DelayRange::from_secs(config.skip_delay_secs.0, config.skip_delay_secs.1),
            skip_penalty: Duration::from_secs(config.skip_penalty_secs),
        }
    }

    /// Pacing with every delay set to zero
    pub fn none() -> Self {
        Self {
            reveal: DelayRange::ZERO,
            before_request: DelayRange::ZERO,
            after_request: Duration::ZERO,
            after_skip: DelayRange::ZERO,
            skip_penalty: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&PacingConfig::default())
    }
}
