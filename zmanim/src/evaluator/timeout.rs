//! Wall-clock limit for one evaluation run

use crate::{ResourceLimits, ZmanimError};
use std::time::Instant;

/// Tracks elapsed time since a run started
pub struct TimeoutTracker {
    start_time: Instant,
}

impl TimeoutTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Returns an error once the run has exceeded `max_evaluation_time_ms`
    pub fn check_timeout(&self, limits: &ResourceLimits) -> Result<(), ZmanimError> {
        let elapsed_ms = self.start_time.elapsed().as_millis() as u64;
        if elapsed_ms > limits.max_evaluation_time_ms {
            return Err(ZmanimError::ResourceLimitExceeded {
                limit_name: "max_evaluation_time_ms".to_string(),
                limit_value: limits.max_evaluation_time_ms.to_string(),
                actual_value: elapsed_ms.to_string(),
                suggestion: format!(
                    "Evaluation took {}ms, exceeding the limit of {}ms. Request fewer zmanim or increase the timeout.",
                    elapsed_ms, limits.max_evaluation_time_ms
                ),
            });
        }
        Ok(())
    }
}

impl Default for TimeoutTracker {
    fn default() -> Self {
        Self::new()
    }
}
