//! Fixed-delay retry wrapper used around every remote call.
//!
//! Failures are classified with [`classify_error`]: transient failures are
//! retried after a fixed delay until the retry budget is spent, permanent
//! failures surface immediately.
//!
//! # Example
//!
//! ```
//! use test_content_core::api::{ApiError, FailureType, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = ApiError::http_status("https://dev.azure.com/org/proj/_apis/test/runs", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::ApiError;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Classification of API failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed on another attempt (network, timeout, any HTTP status).
    Transient,

    /// Cannot succeed on retry (bad URL, local IO, malformed response).
    Permanent,
}

/// Decision on whether to retry a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the call after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the call.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Fixed-delay retry configuration.
///
/// # Default Values
///
/// - `max_retries`: 3 (so at most 4 attempts)
/// - `delay`: 1000 ms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom retry budget and delay.
    #[must_use]
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Creates a policy with a custom retry budget, using the default delay.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the number of retries allowed after the initial attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt > self.max_retries {
            debug!(attempt, max_retries = self.max_retries, "retry budget spent");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }

    /// Runs `call` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the permanent error as-is, or [`ApiError::RetriesExhausted`]
    /// wrapping the last transient failure.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            if failure_type == FailureType::Permanent {
                debug!(operation, attempt, error = %error, "permanent failure, not retrying");
                return Err(error);
            }

            match self.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        operation,
                        attempt,
                        next_attempt = next,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(operation, attempt, %reason, "not retrying");
                    return Err(ApiError::retries_exhausted(operation, attempt - 1, error));
                }
            }
        }
    }
}

/// Classifies an API error for retry decisions.
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | HttpStatus | Transient | Remote wrapper retries every status |
/// | Timeout / Network | Transient | Service may recover |
/// | Io | Permanent | Local file system issue |
/// | InvalidUrl | Permanent | Won't parse next time either |
/// | Decode / InvalidRecord | Permanent | Same body would come back |
/// | RetriesExhausted | Permanent | Already retried |
#[must_use]
pub fn classify_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::HttpStatus { .. } | ApiError::Timeout { .. } | ApiError::Network { .. } => {
            FailureType::Transient
        }
        ApiError::Io { .. }
        | ApiError::InvalidUrl { .. }
        | ApiError::Decode { .. }
        | ApiError::InvalidRecord { .. }
        | ApiError::RetriesExhausted { .. } => FailureType::Permanent,
    }
}
