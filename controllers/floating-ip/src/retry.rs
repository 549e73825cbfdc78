//! # Transient retry policy
//!
//! Runs a lookup repeatedly under two independent budgets:
//!
//! - the **retry budget** is spent only by clean attempts that found nothing,
//!   so it measures how long we wait for the control plane to catch up;
//! - the **error budget** is spent only by attempts that failed outright, so a
//!   burst of flaky connectivity cannot burn down the wait for propagation.
//!
//! The run ends at the first match, or when either budget is exhausted. Exhaustion
//! is an ordinary outcome, never an error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a policy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// A definitive match
    Found(T),
    /// Budgets ran out first
    Exhausted {
        /// Clean attempts that found nothing
        attempts: u32,
        /// Attempts that failed
        errors: u32,
    },
}

impl<T> RetryOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Retry budget, error cap and fixed interval for a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientRetryPolicy {
    pub max_attempts: u32,
    pub max_errors: u32,
    pub interval: Duration,
}

impl TransientRetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, max_errors: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            max_errors,
            interval,
        }
    }

    /// Run `attempt` until it yields a value or a budget is spent
    ///
    /// `attempt` returns `Ok(Some(_))` for a match, `Ok(None)` for a clean miss
    /// and `Err(_)` for a failed query. The interval is slept only when another
    /// attempt follows.
    pub async fn run<F, Fut, T, E>(&self, operation_name: &str, mut attempt: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        let mut retries_left = self.max_attempts;
        let mut errors = 0u32;

        while retries_left > 0 && errors < self.max_errors {
            match attempt().await {
                Ok(Some(value)) => {
                    debug!(
                        operation = %operation_name,
                        attempts = self.max_attempts - retries_left + 1,
                        errors,
                        "Found"
                    );
                    return RetryOutcome::Found(value);
                }
                Ok(None) => {
                    retries_left -= 1;
                    debug!(operation = %operation_name, retries_left, "No match yet");
                }
                Err(e) => {
                    errors += 1;
                    warn!(
                        operation = %operation_name,
                        errors,
                        max_errors = self.max_errors,
                        error = %e,
                        "Attempt failed"
                    );
                }
            }

            if retries_left > 0 && errors < self.max_errors {
                tokio::time::sleep(self.interval).await;
            }
        }

        let attempts = self.max_attempts - retries_left;
        warn!(operation = %operation_name, attempts, errors, "Gave up without a match");
        RetryOutcome::Exhausted { attempts, errors }
    }
}
