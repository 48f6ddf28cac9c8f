//! Retry policies.
//!
//! Two independent policies exist on purpose: [`ReadRetryPolicy`] only covers a
//! contact that is not visible yet, [`SessionRetryPolicy`] only covers transient
//! store failures of a whole unit of work. Neither retries what the other one
//! handles.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay and attempt budget for looking up a contact that may still be
/// replicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRetryPolicy {
    delay: Duration,
    max_attempts: u32,
}

impl ReadRetryPolicy {
    /// Builds a policy from a delay in milliseconds and a total attempt count.
    ///
    /// `retry_count` counts every fetch, the first one included. Zero is treated
    /// as one; a negative delay is treated as zero.
    pub fn new(delay_ms: i64, retry_count: u32) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms.max(0) as u64),
            max_attempts: retry_count.max(1),
        }
    }

    /// Single fetch, no waiting.
    pub fn no_retry() -> Self {
        Self::new(0, 1)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReadRetryPolicy {
    fn default() -> Self {
        Self::new(500, 6)
    }
}

/// Strategy for spacing out session retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed,
    /// Delay grows by `base_delay` per failed attempt.
    Linear,
    /// Delay doubles per failed attempt.
    Exponential,
}

/// Retry configuration for the session wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRetryPolicy {
    /// Maximum number of times a unit of work runs, the first run included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_strategy: BackoffStrategy,
}

impl Default for SessionRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }
}

impl SessionRetryPolicy {
    /// A policy that runs the unit of work exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the `failed_attempts`-th failure (1-based), capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, failed_attempts: u32) -> Duration {
        let n = failed_attempts.max(1);
        let delay = match self.backoff_strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(n),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}
