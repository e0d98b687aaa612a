// Fixed-delay retry budget for pipeline stages.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::config::Config;

/// Retries after the first attempt, with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pipeline_retries, config.pipeline_retry_delay)
    }

    /// Run `op` until it succeeds or the budget is spent. The closure gets
    /// the 1-based attempt number. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(
                        stage = label,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        delay_secs = self.delay.as_secs(),
                        "Stage attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
