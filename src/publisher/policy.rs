//! Explicit reconnect policy of the publisher loop
//!
//! Independent of the broker client's own automatic retries; both run at
//! the same time.

use std::time::Duration;

/// Attempts allowed per disconnection incident before giving up for the tick
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Outcome of asking the policy whether to try again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Go ahead with attempt number `attempt`
    Attempt { attempt: u32 },
    /// Ceiling exceeded; skip reconnecting this tick
    Exhausted { attempts: u32 },
}

/// Bounded attempts with linear backoff capped at `backoff_cap`
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
    pub backoff_cap: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    pub fn decide(&self, attempt: u32) -> ReconnectDecision {
        if attempt > self.max_attempts {
            ReconnectDecision::Exhausted { attempts: attempt }
        } else {
            ReconnectDecision::Attempt { attempt }
        }
    }

    /// Wait after failed attempt number `attempt`: `min(cap, step * attempt)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step
            .saturating_mul(attempt)
            .min(self.backoff_cap)
    }
}
