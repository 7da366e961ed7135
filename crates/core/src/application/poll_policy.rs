// Poll failure policy
use crate::error::AppError;
use tracing::warn;

/// What a subscription does after a failed fetch
#[derive(Debug)]
pub enum PollDecision {
    /// Swallow the error; the next scheduled tick is the retry
    Continue,
    /// Terminate the subscription and surface this error
    Stop(AppError),
}

/// Tracks consecutive failures of one subscription.
///
/// - `NotFound` / `Unauthorized` stop immediately
/// - anything else is retried at the fixed poll interval (no backoff) until
///   `max_consecutive_failures` ticks in a row have failed, which yields
///   `LostConnection`
/// - a successful fetch resets the counter
#[derive(Debug)]
pub struct PollFailurePolicy {
    max_consecutive_failures: u32,
    consecutive_failures: u32,
}

impl PollFailurePolicy {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            max_consecutive_failures: max_consecutive_failures.max(1),
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, error: AppError) -> PollDecision {
        if error.is_fatal_for_polling() {
            return PollDecision::Stop(error);
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_consecutive_failures {
            return PollDecision::Stop(AppError::LostConnection {
                failures: self.consecutive_failures,
                last_error: error.to_string(),
            });
        }

        warn!(
            error = %error,
            consecutive_failures = self.consecutive_failures,
            max_consecutive_failures = self.max_consecutive_failures,
            "Poll tick failed, retrying at next interval"
        );
        PollDecision::Continue
    }
}
