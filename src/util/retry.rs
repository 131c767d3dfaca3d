use std::time::Duration;

use tracing::instrument;

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_MS, RETRY_MAX_DELAY_MS};

/// Errors that may succeed if the same call is simply made again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    attempts: u32,
    base: Duration,
    max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_ATTEMPTS,
            Duration::from_millis(DEFAULT_RETRY_BASE_MS),
        )
    }
}

impl Backoff {
    pub fn new(attempts: u32, base: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base,
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }

    /// Delay after the failed attempt `attempt` (0-indexed): `base * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `f` until it succeeds, fails with a non-transient error, or attempts run out. The last
    /// error is returned as-is.
    #[instrument(skip(self, f))]
    pub async fn run<T, E, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, E>
    where
        E: Transient + core::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(val) => return Ok(val),
                Err(e) if e.is_transient() && attempt + 1 < self.attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_attempts = self.attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
