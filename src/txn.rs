//! Transactional store boundary used by the concurrency strategies.
//!
//! The strategies in [`crate::strategies`] are written against two small
//! traits rather than any concrete database client:
//!
//! - [`TransactionalStore`] - hands out sessions and owns the default
//!   isolation level, the way a connection pool owns server settings.
//! - [`Session`] - one connection's view of the counter table: parameterized
//!   reads and writes, a read-with-lock primitive, a versioned conditional
//!   update, and explicit commit/rollback.
//!
//! A store must signal rejected transactions with
//! [`CounterError::SerializationFailure`](crate::error::CounterError) and
//! lock-wait expiry with
//! [`CounterError::LockTimeout`](crate::error::CounterError) so callers can
//! distinguish "retry me" from terminal failures.
//!
//! The [`memory`] module provides an in-process implementation with genuine
//! transaction semantics (buffered writes, row locks held to commit,
//! first-committer-wins validation under [`IsolationLevel::Serializable`]).
//! It exists so the strategy catalog, the benchmark harness and the tests can
//! exercise real interleavings without a database server; a real relational
//! client would implement the same two traits.

pub mod memory;

use crate::error::Result;

/// Transaction isolation level requested for new sessions.
///
/// Only the two levels that matter for the lost-update phenomenon are
/// modeled: under [`ReadCommitted`](IsolationLevel::ReadCommitted) a stale
/// read-modify-write silently loses updates, while under
/// [`Serializable`](IsolationLevel::Serializable) the same workload surfaces
/// as explicit serialization failures instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Each statement sees the latest committed data.
    #[default]
    ReadCommitted,
    /// Transactions behave as if executed one at a time; conflicting
    /// commits are rejected.
    Serializable,
}

impl IsolationLevel {
    /// Returns the level spelled the way servers report it.
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "read committed",
            IsolationLevel::Serializable => "serializable",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the counter table: the value plus the version column used by
/// the optimistic strategy.
///
/// Any optimistic write must supply the version last observed by the writer;
/// a mismatch means the write did not apply and must be retried from a fresh
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRow {
    /// Current counter value.
    pub count: u64,
    /// Write version, bumped by each versioned update.
    pub version: u64,
}

/// Hands out transactional sessions over the counter table.
///
/// Implementations are shared by all workers of a benchmark run, so they
/// must be `Send + Sync`; each worker obtains its own [`Session`].
pub trait TransactionalStore: Send + Sync {
    /// The session type produced by this store.
    type Session: Session + Send;

    /// Opens a new session.
    ///
    /// Fails with [`BackendUnavailable`](crate::error::CounterError) if the
    /// underlying system cannot be reached.
    fn session(&self) -> Result<Self::Session>;

    /// Sets the isolation level applied to sessions opened after this call.
    fn set_isolation(&self, level: IsolationLevel);

    /// Returns the isolation level new sessions will run under.
    fn isolation(&self) -> IsolationLevel;
}

/// One connection's transactional view of the counter table.
///
/// A transaction starts implicitly with the first statement and ends with
/// [`commit`](Session::commit) or [`rollback`](Session::rollback). Dropping
/// a session with an open transaction discards its writes and releases its
/// row locks.
pub trait Session {
    /// Reads the row for `key`.
    fn select(&mut self, key: u64) -> Result<CounterRow>;

    /// Reads the row for `key` while acquiring an exclusive row lock held
    /// until the transaction ends.
    ///
    /// Blocks while another session holds the lock; gives up with
    /// [`LockTimeout`](crate::error::CounterError) after the store's wait
    /// budget.
    fn select_for_update(&mut self, key: u64) -> Result<CounterRow>;

    /// Writes `count` to the row for `key`, leaving the version column
    /// unchanged.
    fn update_count(&mut self, key: u64, count: u64) -> Result<()>;

    /// Writes `count` and `version` to the row for `key` only if the row's
    /// version still equals `expected_version`.
    ///
    /// Returns `true` if the row was updated, `false` if another writer got
    /// there first (zero rows affected).
    fn update_if_version(
        &mut self,
        key: u64,
        count: u64,
        version: u64,
        expected_version: u64,
    ) -> Result<bool>;

    /// Increments the row's count by one in a single server-side expression
    /// and returns the post-update value.
    ///
    /// There is no separate read step, so this is immune to the lost-update
    /// race at any isolation level.
    fn increment_in_place(&mut self, key: u64) -> Result<u64>;

    /// Creates the row for `key` with the given values, or overwrites it if
    /// present.
    fn upsert_row(&mut self, key: u64, count: u64, version: u64) -> Result<()>;

    /// Commits the transaction, making its writes visible and releasing its
    /// row locks.
    ///
    /// Under [`IsolationLevel::Serializable`] a conflicting concurrent
    /// commit makes this fail with
    /// [`SerializationFailure`](crate::error::CounterError); the transaction
    /// is rolled back and can be retried from the start.
    fn commit(&mut self) -> Result<()>;

    /// Abandons the transaction, discarding its writes and releasing its
    /// row locks.
    fn rollback(&mut self) -> Result<()>;
}
