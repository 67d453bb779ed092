//! ============================================================================
//! Retry Logic - Bounded retries with fixed or exponential backoff
//! ============================================================================
//! Wraps any async operation that may fail transiently:
//! - Sequential attempts, no delay before the first one
//! - Fixed delay by default, exponential backoff with a cap on request
//! - Optional jitter (0-50% extra delay)
//! - Optional predicate separating retryable from fatal errors
//!
//! Individual failures are only logged. Exhaustion yields a single
//! `RetryError::Exhausted`; callers that need the cause must read the logs.
//! ============================================================================

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Terminal outcome of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed
    #[error("Action failed after {attempts} attempts, giving up")]
    Exhausted { attempts: u32 },
    /// The policy classified the error as not worth retrying
    #[error("Action failed with a non-retryable error: {0}")]
    Fatal(E),
}

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Base delay doubled per retry, capped at `max_delay`
    Exponential { max_delay: Duration },
}

type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Retry behavior for one call site
pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    pub jitter: bool,
    retry_if: Option<RetryPredicate<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            backoff: self.backoff,
            jitter: self.jitter,
            retry_if: self.retry_if.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("retry_if", &self.retry_if.is_some())
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    /// 3 attempts, 500ms apart, every error retried
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_DELAY_MS))
    }
}

impl<E> RetryPolicy<E> {
    /// Constant delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            backoff: Backoff::Fixed,
            jitter: false,
            retry_if: None,
        }
    }

    /// Doubling delay starting at `base_delay`, never above `max_delay`
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff: Backoff::Exponential { max_delay },
            jitter: false,
            retry_if: None,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Only retry errors for which `predicate` returns true
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    fn is_retryable(&self, error: &E) -> bool {
        self.retry_if.as_ref().map_or(true, |predicate| predicate(error))
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis().min(u128::from(u64::MAX)) as u64;

        let delay_ms = match self.backoff {
            Backoff::Fixed => base_ms,
            Backoff::Exponential { max_delay } => {
                let multiplier = 2u64.saturating_pow(retry.min(63));
                let max_ms = max_delay.as_millis().min(u128::from(u64::MAX)) as u64;
                base_ms.saturating_mul(multiplier).min(max_ms)
            }
        };

        let final_ms = if self.jitter {
            let jitter_factor = 1.0 + rand::thread_rng().gen_range(0.0..=0.5);
            (delay_ms as f64 * jitter_factor) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_ms)
    }

    /// Run `action` until it succeeds, the policy rejects an error, or the
    /// attempt budget is used up.
    pub async fn run<T, F, Fut>(&self, mut action: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = 0;

        while attempts < self.max_attempts {
            if attempts > 0 {
                let delay = self.delay_for(attempts - 1);
                debug!("Retry attempt {} after {:?} delay", attempts + 1, delay);
                sleep(delay).await;
            }

            match action().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts += 1;
                    if !self.is_retryable(&e) {
                        warn!("Attempt #{} failed with a non-retryable error: {}", attempts, e);
                        return Err(RetryError::Fatal(e));
                    }
                    warn!("Attempt #{} failed: {}", attempts, e);
                }
            }
        }

        warn!("Action failed after {} attempts, giving up", attempts);
        Err(RetryError::Exhausted { attempts })
    }
}

/// Retry `action` up to `max_attempts` times with a fixed `delay` in between,
/// retrying every error.
pub async fn retry<T, E, F, Fut>(
    action: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryPolicy::fixed(max_attempts, delay).run(action).await
}
