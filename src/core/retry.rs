use crate::domain::model::{FetchError, FetchErrorKind, FetchOutcome, ProductRecord};
use std::time::Duration;

/// Single source of truth for retry eligibility and backoff timing. No other
/// component decides whether a failure is transient.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl RetryPolicy {
    /// `retry_attempts` counts retries after the first attempt, so every
    /// identifier gets at least one attempt even with zero retries.
    pub fn new(retry_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: retry_attempts + 1,
            base_delay,
            max_delay,
            multiplier: 2.0,
            jitter: true,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable(kind: FetchErrorKind) -> bool {
        matches!(
            kind,
            FetchErrorKind::Timeout
                | FetchErrorKind::Connect
                | FetchErrorKind::RateLimited
                | FetchErrorKind::ServerError
        )
    }

    /// Turns a raw fetch result plus the attempt count into an outcome.
    /// A retryable error on the last allowed attempt becomes `Permanent`.
    pub fn assess(
        &self,
        result: std::result::Result<ProductRecord, FetchError>,
        attempt: u32,
    ) -> FetchOutcome {
        match result {
            Ok(record) => FetchOutcome::Success(record),
            Err(error) if Self::is_retryable(error.kind) && attempt < self.max_attempts => {
                FetchOutcome::Retryable { error, attempt }
            }
            Err(error) => FetchOutcome::Permanent(error),
        }
    }

    /// Delay before the attempt following `attempt`: exponential from the
    /// base, capped, with a jitter factor in [0.5, 1.5).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.max_delay.as_millis() as f64);
        let millis = if self.jitter {
            capped * (0.5 + fastrand::f64())
        } else {
            capped
        };
        Duration::from_millis(millis as u64)
    }
}
