//! Bounded retry for recoverable store conflicts.
//!
//! Serialization failures and lock-wait timeouts are rejections, not data
//! loss: the store refused the transaction and the logical operation can be
//! re-run from the start. [`attempt`] converts such rejections into eventual
//! success under an explicit, testable [`RetryPolicy`] instead of ad-hoc
//! catch-and-loop control flow at every call site.
//!
//! Terminal errors (backend unavailable, exhausted optimistic budget,
//! corrupt state) pass through untouched on the first occurrence.
//!
//! # Example
//!
//! ```rust,ignore
//! use contesa::retry::{attempt, RetryPolicy};
//!
//! let policy = RetryPolicy::with_backoff(10, std::time::Duration::from_millis(300));
//! attempt(&policy, || {
//!     strategy.apply(&mut session, key)?;
//!     session.commit()
//! })?;
//! ```

use std::time::Duration;

use crate::error::{CounterError, Result};

/// First-class retry budget and backoff for recoverable conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Whether conflicts are retried at all. Disabled means one attempt.
    pub enabled: bool,
    /// Total attempts (including the first) when enabled.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// No retries: a recoverable conflict surfaces to the caller as a
    /// failed attempt.
    pub const fn disabled() -> Self {
        RetryPolicy {
            enabled: false,
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Ten attempts with a fixed 300 ms backoff.
    pub const fn standard() -> Self {
        RetryPolicy {
            enabled: true,
            max_attempts: 10,
            backoff: Duration::from_millis(300),
        }
    }

    /// A policy with a custom attempt budget and backoff.
    pub const fn with_backoff(max_attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            enabled: true,
            max_attempts,
            backoff,
        }
    }

    /// The number of attempts this policy grants.
    pub fn attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

impl Default for RetryPolicy {
    /// Retries are opt-in; the default policy performs a single attempt.
    fn default() -> Self {
        Self::disabled()
    }
}

/// Runs `op`, retrying recoverable conflicts under `policy`.
///
/// Exhausting the budget returns
/// [`RetryExhausted`](CounterError::RetryExhausted) wrapping the final
/// conflict. Non-recoverable errors are returned immediately without
/// consuming further attempts.
pub fn attempt<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.attempts();
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_recoverable() => {
                if attempt == attempts {
                    // With retries disabled the conflict itself is the
                    // outcome; only a spent budget is reported as exhausted.
                    if !policy.enabled {
                        return Err(err);
                    }
                    return Err(CounterError::RetryExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                }
                tracing::warn!(attempt, max = attempts, error = %err, "conflict, retrying");
                std::thread::sleep(policy.backoff);
            }
            Err(err) => return Err(err),
        }
    }
    // attempts >= 1, so the loop always returns.
    unreachable!("retry loop exited without a result")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialization_failure() -> CounterError {
        CounterError::SerializationFailure { key: 1 }
    }

    #[test]
    fn test_success_on_first_attempt() {
        let policy = RetryPolicy::standard();
        let mut calls = 0;
        let result: Result<u32> = attempt(&policy, || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recovers_after_conflicts() {
        let policy = RetryPolicy::with_backoff(5, Duration::ZERO);
        let mut calls = 0;
        let result: Result<&str> = attempt(&policy, || {
            calls += 1;
            if calls < 3 {
                Err(serialization_failure())
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_budget_exhaustion_wraps_final_conflict() {
        let policy = RetryPolicy::with_backoff(3, Duration::ZERO);
        let mut calls = 0;
        let result: Result<()> = attempt(&policy, || {
            calls += 1;
            Err(serialization_failure())
        });
        assert_eq!(calls, 3);
        match result.unwrap_err() {
            CounterError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.is_recoverable());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_terminal_error_not_retried() {
        let policy = RetryPolicy::standard();
        let mut calls = 0;
        let result: Result<()> = attempt(&policy, || {
            calls += 1;
            Err(CounterError::BackendUnavailable("down".into()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(
            result.unwrap_err(),
            CounterError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_disabled_policy_is_single_shot() {
        let policy = RetryPolicy::disabled();
        assert_eq!(policy.attempts(), 1);
        let mut calls = 0;
        let result: Result<()> = attempt(&policy, || {
            calls += 1;
            Err(serialization_failure())
        });
        assert_eq!(calls, 1);
        assert!(matches!(
            result.unwrap_err(),
            CounterError::SerializationFailure { .. }
        ));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::with_backoff(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }
}
