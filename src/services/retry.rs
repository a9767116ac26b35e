//! Bounded retry with exponential backoff for transient storage faults.
//!
//! Only the file-id resolution round-trip runs under this executor. Bulk
//! inserts are left out on purpose: they fail the whole file and roll the
//! transaction back instead of retrying.

use crate::error::PipelineError;
use log::warn;
use rand::Rng;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt: one second doubled per failed attempt,
    /// clamped to `[min_wait, max_wait]`.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let shift = failed_attempts.saturating_sub(1).min(32);
        let exponential = Duration::from_secs(1u64 << shift);
        exponential.clamp(self.min_wait, self.max_wait)
    }
}

/// Run `op`, retrying transient errors until it succeeds or the attempt cap
/// is reached. Non-transient errors propagate immediately.
pub fn with_retries<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let mut attempt = 1u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let wait = policy.backoff(attempt) + jitter();
                warn!(
                    "Transient storage error (attempt {}/{}), retrying in {:?}: {}",
                    attempt, policy.max_attempts, wait, e
                );
                thread::sleep(wait);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// Small random offset so concurrent deployments do not retry in lockstep.
fn jitter() -> Duration {
    Duration::from_millis(rand::rng().random_range(0..=250))
}
