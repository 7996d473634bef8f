//! Unified error type for stores, strategies and the benchmark harness.
//!
//! This module provides a single [`CounterError`] type shared by every backend
//! and strategy in the crate. This allows client code to switch between
//! backends without changing error handling logic, and lets the harness
//! classify a failure as recoverable (retry) or terminal in one place.
//!
//! # Example
//!
//! ```rust,ignore
//! use contesa::error::{Result, CounterError};
//!
//! fn bump(store: &dyn contesa::stores::CounterStore) -> Result<u64> {
//!     // Works with any backend - same error type!
//!     store.increment()
//! }
//! ```

use thiserror::Error;

/// Unified error type for all counter operations.
///
/// The variants mirror the failure modes of the underlying stores:
/// setup failures are terminal, transaction conflicts are recoverable,
/// and an exhausted optimistic retry budget is terminal for that one
/// increment only.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The underlying backend could not be reached or set up.
    ///
    /// Terminal: surfaced immediately to the caller, never retried inside
    /// the crate.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The transactional store rejected a commit because completing it
    /// would violate the requested isolation guarantee.
    ///
    /// Recoverable: the logical operation can be re-run from the start.
    #[error("serialization failure on key {key}")]
    SerializationFailure {
        /// Row key of the conflicting transaction.
        key: u64,
    },

    /// A row lock could not be acquired within the store's wait budget.
    ///
    /// Recoverable, same retry treatment as [`Self::SerializationFailure`].
    #[error("lock wait timeout on key {key}")]
    LockTimeout {
        /// Row key the lock was requested for.
        key: u64,
    },

    /// The optimistic strategy observed a version mismatch on every one of
    /// its attempts and gave up.
    ///
    /// Terminal for that increment; the worker logs it and moves on to its
    /// next iteration.
    #[error("optimistic update failed after {attempts} attempts")]
    OptimisticConflictExhausted {
        /// Number of attempts performed before giving up.
        attempts: u32,
    },

    /// A retried operation exhausted its attempt budget without succeeding.
    #[error("retry budget exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// The conflict observed on the final attempt.
        #[source]
        source: Box<CounterError>,
    },

    /// The requested row does not exist in the store.
    #[error("no row for key {key}")]
    MissingRow {
        /// The key that was looked up.
        key: u64,
    },

    /// I/O failure from the file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted counter file exists but does not contain a valid value.
    #[error("corrupt counter file: {0}")]
    Corrupt(String),
}

impl CounterError {
    /// Returns `true` for conflicts that a bounded retry can convert into
    /// eventual success.
    ///
    /// Terminal conditions (setup failures, exhausted budgets, corrupt
    /// state) return `false` and must be surfaced to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CounterError::SerializationFailure { .. } | CounterError::LockTimeout { .. }
        )
    }
}

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(CounterError::SerializationFailure { key: 1 }.is_recoverable());
        assert!(CounterError::LockTimeout { key: 1 }.is_recoverable());
        assert!(!CounterError::BackendUnavailable("down".into()).is_recoverable());
        assert!(!CounterError::OptimisticConflictExhausted { attempts: 100 }.is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = CounterError::SerializationFailure { key: 7 };
        assert_eq!(err.to_string(), "serialization failure on key 7");

        let err = CounterError::OptimisticConflictExhausted { attempts: 100 };
        assert_eq!(err.to_string(), "optimistic update failed after 100 attempts");
    }

    #[test]
    fn test_retry_exhausted_carries_source() {
        let err = CounterError::RetryExhausted {
            attempts: 10,
            source: Box::new(CounterError::SerializationFailure { key: 1 }),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("after 10 attempts"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CounterError = io.into();
        assert!(matches!(err, CounterError::Io(_)));
    }
}
