//! Bounded retry with linear backoff
//!
//! A `RetryPolicy` wraps any fallible operation and re-runs it while the
//! error reports itself as transient. The delay before attempt `n + 1` is
//! `base_delay * n`.

use std::thread;
use std::time::Duration;

/// Default number of attempts (the first call included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    /// Returns true if the failed operation is worth running again
    fn is_retryable(&self) -> bool;
}

/// Linear backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay unit, multiplied by the number of the failed attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting in between
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt budget is spent
    ///
    /// The closure receives the 1-based attempt number. On exhaustion the error
    /// of the last attempt is returned together with the number of attempts made.
    pub fn run<T, E, F>(&self, op: F) -> Result<T, (E, u32)>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run_with_sleep(op, thread::sleep)
    }

    /// Same as [`RetryPolicy::run`] with an injectable sleep function
    pub fn run_with_sleep<T, E, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, (E, u32)>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    tracing::debug!("Retry {}/{}: {}", attempt, max_attempts, e);
                    sleep(self.delay_after(attempt));
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky {
        permanent: bool,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky")
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            !self.permanent
        }
    }

    #[test]
    fn test_always_failing_operation_uses_every_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        let calls = Cell::new(0);
        let mut delays = Vec::new();

        let result: Result<(), _> = policy.run_with_sleep(
            |_| {
                calls.set(calls.get() + 1);
                Err(Flaky { permanent: false })
            },
            |d| delays.push(d),
        );

        let (_, attempts) = result.unwrap_err();
        assert_eq!(attempts, 4);
        assert_eq!(calls.get(), 4);
        // No sleep after the final attempt
        assert_eq!(delays.len(), 3);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[2], Duration::from_millis(300));
    }

    #[test]
    fn test_success_after_transient_failure() {
        let policy = RetryPolicy::immediate(3);
        let result: Result<u32, (Flaky, u32)> = policy.run_with_sleep(
            |attempt| {
                if attempt < 2 {
                    Err(Flaky { permanent: false })
                } else {
                    Ok(attempt)
                }
            },
            |_| {},
        );
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let calls = Cell::new(0);
        let result: Result<(), _> = policy.run_with_sleep(
            |_| {
                calls.set(calls.get() + 1);
                Err(Flaky { permanent: true })
            },
            |_| panic!("must not sleep"),
        );
        assert_eq!(result.unwrap_err().1, 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::immediate(0);
        let calls = Cell::new(0);
        let _: Result<(), _> = policy.run_with_sleep(
            |_| {
                calls.set(calls.get() + 1);
                Err(Flaky { permanent: false })
            },
            |_| {},
        );
        assert_eq!(calls.get(), 1);
    }
}
