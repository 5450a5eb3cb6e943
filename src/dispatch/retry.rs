//! Retry with exponential backoff for transient send failures.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::DispatchError;

/// Retries an async send while it fails with a retryable [`DispatchError`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    settings: RetrySettings,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Creates a policy; every attempt is limited to `attempt_timeout`.
    pub fn new(settings: RetrySettings, attempt_timeout: Duration) -> Self {
        Self {
            settings,
            attempt_timeout,
        }
    }

    /// Delay before retry number `retry` (zero-based) after `error`.
    ///
    /// Rate-limited sends start from the longer rate-limit delay. Both double per
    /// retry and are capped at the configured maximum.
    pub fn delay_for(&self, error: &DispatchError, retry: u32) -> Duration {
        let base = match error {
            DispatchError::RateLimited { .. } => self.settings.rate_limit_delay_ms,
            _ => self.settings.base_delay_ms,
        };
        let millis = base
            .saturating_mul(2u64.saturating_pow(retry))
            .min(self.settings.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Runs `send` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. An attempt that exceeds the timeout counts as a
    /// [`DispatchError::TransientNetwork`] failure.
    pub async fn call<F, Fut>(&self, mut send: F) -> Result<(), DispatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), DispatchError>>,
    {
        let mut retry = 0;

        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, send()).await {
                Ok(result) => result,
                Err(_) => Err(DispatchError::TransientNetwork {
                    message: format!("send timed out after {:?}", self.attempt_timeout),
                }),
            };

            match result {
                Ok(()) => {
                    if retry > 0 {
                        debug!(retries = retry, "Send succeeded after retry");
                    }
                    return Ok(());
                }
                Err(error) if error.is_retryable() && retry < self.settings.max_retries => {
                    let delay = self.delay_for(&error, retry);
                    warn!(
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
