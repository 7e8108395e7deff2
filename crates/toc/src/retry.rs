use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::TocError;

/// Retry-with-backoff-and-timeout combinator for calls into a document
/// handle.
///
/// Each attempt is bounded by `timeout`; an attempt that times out counts as
/// failed. Before attempt `n + 1` the policy sleeps `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// A single attempt, no backoff.
    pub fn once(timeout: Duration) -> Self {
        RetryPolicy {
            attempts: 1,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted, returning
    /// the last error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, TocError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TocError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let err = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!("{operation} succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => TocError::Timeout {
                    operation: operation.to_string(),
                    after: self.timeout,
                },
            };

            warn!("{operation} failed (attempt {attempt}/{attempts}): {err}");
            last_error = Some(err);

            if attempt < attempts {
                tokio::time::sleep(self.base_delay * attempt).await;
            }
        }

        Err(last_error.unwrap_or_else(|| TocError::Timeout {
            operation: operation.to_string(),
            after: self.timeout,
        }))
    }
}
