//! Fixed-delay retry around one description attempt.

use std::future::Future;
use std::time::Duration;

use blindspot_core::{
    BlindSpotError, DescriptionResult, ErrorKind, FailureRecord, ImportanceRange, PipelineOutcome,
};
use tracing::{error, warn};

/// Attempt budget and the constant pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Runs an attempt function until it succeeds or the budget runs out.
///
/// Every error is retried; there is no exponential backoff and no jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
    range: ImportanceRange,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy, range: ImportanceRange) -> Self {
        Self { policy, range }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call `attempt(n)` for `n = 1..=max_attempts`, pausing between failures.
    ///
    /// Exhaustion yields `Failure`; its kind comes from the last error.
    pub async fn execute<F, Fut>(&self, mut attempt: F) -> PipelineOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<DescriptionResult, BlindSpotError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for n in 1..=max_attempts {
            let e = match attempt(n).await {
                Ok(result) => return PipelineOutcome::Success(result),
                Err(e) => e,
            };

            if e.is_validation() {
                warn!(attempt = n, max_attempts, error = %e, "Parsing error");
            } else {
                warn!(attempt = n, max_attempts, error = %e, "Model call failed");
            }
            last_error = Some(e);

            if n < max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        let (kind, message) = match last_error {
            Some(e) if e.is_validation() => (ErrorKind::ParseError, e.to_string()),
            Some(e) => (ErrorKind::CallError, e.to_string()),
            None => (ErrorKind::CallError, "no attempt was made".to_string()),
        };
        error!(attempts = max_attempts, kind = %kind, error = %message, "Giving up on image");

        PipelineOutcome::Failure(FailureRecord {
            kind,
            message,
            attempts: max_attempts,
            fallback: DescriptionResult::fallback(self.range),
        })
    }
}
