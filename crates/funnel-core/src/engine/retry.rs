//! Per-node retry policy.
//!
//! Stateless: the attempt count is read from the errors already recorded
//! on the execution, so the budget is per node ID over the whole run.

use std::time::Duration;

use funnel_types::config::EngineConfig;

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retry_attempts: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            delay: config.retry_delay(),
        }
    }

    /// Decide whether to re-run a node.
    ///
    /// `recorded_errors` counts errors for the node including the one just
    /// recorded, so a node that always fails runs `max_retry_attempts + 1`
    /// times.
    pub fn should_retry(&self, error: &EngineError, recorded_errors: usize) -> bool {
        error.is_retryable() && recorded_errors <= self.max_retry_attempts as usize
    }
}
