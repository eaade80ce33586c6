//! Retry and rate-limit policy for sync passes.

use std::time::Duration;

/// The single place retry counting and batch pacing are configured.
///
/// Consumed only by the orchestrator: `max_attempts` caps how often a
/// queued record is retried before it is parked, `inter_batch_delay` is the
/// pause between consecutive batches of a sync pass.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum sync tries per record before automatic retries stop.
    pub max_attempts: u32,
    /// Delay between consecutive batches.
    pub inter_batch_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt cap.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            inter_batch_delay: Duration::from_secs(2),
        }
    }

    /// Set the delay between batches.
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    /// Whether a record with this many attempts is out of automatic retries.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
