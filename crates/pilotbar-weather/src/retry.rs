//! Bounded retry with a fixed backoff.
//!
//! Retried:
//! - local transport timeouts
//! - 408, 429, 500, 502, 503, 504
//!
//! Everything else (other statuses, connection failures, envelope decode
//! failures, empty result sets) fails on first occurrence.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::FetchError;

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_SECS: u64 = 2;

/// Statuses worth another attempt. Adding a transient code is a one-line edit.
const RETRYABLE_STATUSES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Constant delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(max_attempts, self.backoff)
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Should retry the request
    Retry,
    /// Should not retry - permanent failure
    NoRetry,
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if RETRYABLE_STATUSES.contains(&status) {
        tracing::debug!("Status {} is retryable", status);
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Run `operation` until it succeeds, fails fatally, or the attempt budget
/// is spent. The closure receives the 1-based attempt number.
///
/// Returns the successful value or the most recent error.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Request succeeded on attempt {} of {}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if error.retry_decision() == RetryDecision::NoRetry {
            tracing::debug!("Non-retryable error: {}", error);
            return Err(error);
        }

        if attempt >= max_attempts {
            tracing::error!("All {} attempts exhausted: {}", max_attempts, error);
            return Err(error);
        }

        tracing::warn!(
            "Retryable error on attempt {} of {}, waiting {:?}: {}",
            attempt,
            max_attempts,
            policy.backoff,
            error
        );
        tokio::time::sleep(policy.backoff).await;
        attempt += 1;
    }
}
