//! Bounded retry for rate-limited source requests
//!
//! A request that reports [`SourceError::RateLimited`] is repeated after a
//! delay scaled by the attempt number, up to `max_attempts` attempts. Any
//! other failure is returned immediately.

use crate::core::error::{BuildError, BuildResult, SourceError, SourceResult};
use log::warn;
use std::time::Duration;

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait used when the server does not say how long to back off
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Blocking wait between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How the wait grows with the attempt number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// `delay * attempt`
    #[default]
    Linear,
    /// `delay` on every attempt
    Constant,
}

/// Retry policy for segment source requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub default_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Linear,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, default_delay: Duration) -> Self {
        Self {
            max_attempts,
            default_delay,
            backoff: Backoff::Linear,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before the next attempt after `attempt` (1-based) was rate limited
    ///
    /// A server-specified `retry_after` replaces the default delay.
    ///
    /// # Examples
    /// ```
    /// use asm_remap::core::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_secs(2));
    /// assert_eq!(policy.delay_for(1, None), Duration::from_secs(2));
    /// assert_eq!(policy.delay_for(2, Some(Duration::from_secs(5))), Duration::from_secs(10));
    /// ```
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = retry_after.unwrap_or(self.default_delay);
        match self.backoff {
            Backoff::Linear => base.saturating_mul(attempt.max(1)),
            Backoff::Constant => base,
        }
    }

    /// Run `request` until it succeeds, fails fatally, or the attempts run out
    ///
    /// `operation` names the request in errors and log messages.
    pub fn run<T, F>(&self, operation: &str, sleeper: &dyn Sleeper, mut request: F) -> BuildResult<T>
    where
        F: FnMut() -> SourceResult<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match request() {
                Ok(value) => return Ok(value),
                Err(SourceError::RateLimited { retry_after }) => {
                    if attempt >= max_attempts {
                        return Err(BuildError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                        });
                    }
                    let wait = self.delay_for(attempt, retry_after);
                    warn!(
                        "{}: request rate limit reached, waiting {:.1}s (attempt {}/{})",
                        operation,
                        wait.as_secs_f64(),
                        attempt,
                        max_attempts
                    );
                    sleeper.sleep(wait);
                }
                Err(source) => {
                    return Err(BuildError::Source {
                        operation: operation.to_string(),
                        source,
                    })
                }
            }
        }
    }
}
