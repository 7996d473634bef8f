//! Catalog of concurrency-control strategies for incrementing a shared row.
//!
//! Every strategy performs the same logical operation - add one to the
//! counter row - but with a different protection against concurrent writers:
//!
//! | Strategy | Protection | Outcome under contention |
//! |----------|------------|--------------------------|
//! | [`naive`] | none | silently loses updates (the negative baseline) |
//! | [`atomic`] | server-side expression | correct at any isolation level |
//! | [`pessimistic`] | exclusive row lock | correct, throughput bound by lock hold time |
//! | [`optimistic`] | version check at write | correct, retries on conflict |
//!
//! A strategy issues statements against a [`Session`] but does **not**
//! commit: the caller owns the transaction boundary, so it can roll back and
//! retry the whole operation when the store rejects a commit under
//! serializable isolation.
//!
//! Dispatch goes through the closed [`Strategy`] enum - one tag per
//! algorithm, selected by name on the benchmark surface.
//!
//! # Example
//!
//! ```rust
//! use contesa::strategies::Strategy;
//! use contesa::txn::{memory::MemStore, Session, TransactionalStore};
//!
//! let store = MemStore::new();
//! let mut session = store.session().unwrap();
//! session.upsert_row(1, 0, 0).unwrap();
//! session.commit().unwrap();
//!
//! Strategy::AtomicUpdate.apply(&mut session, 1).unwrap();
//! session.commit().unwrap();
//! assert_eq!(session.select(1).unwrap().count, 1);
//! ```

pub mod atomic;
pub mod naive;
pub mod optimistic;
pub mod pessimistic;

use crate::error::{CounterError, Result};
use crate::txn::Session;

/// The closed set of increment algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `SELECT` the count, add one in the caller, `UPDATE` it back.
    /// No atomicity guarantee; the deliberate lost-update baseline.
    ReadModifyWrite,
    /// Single `count = count + 1` expression computed by the store.
    AtomicUpdate,
    /// `SELECT ... FOR UPDATE`, then compute and `UPDATE` under the row lock.
    SelectForUpdate,
    /// Read `{count, version}`, conditionally write `{count+1, version+1}`,
    /// retry from the read on version mismatch.
    OptimisticVersioning,
}

impl Strategy {
    /// Every strategy, in catalog order.
    pub const ALL: [Strategy; 4] = [
        Strategy::ReadModifyWrite,
        Strategy::AtomicUpdate,
        Strategy::SelectForUpdate,
        Strategy::OptimisticVersioning,
    ];

    /// Stable name used on the benchmark surface and in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ReadModifyWrite => "read-modify-write",
            Strategy::AtomicUpdate => "atomic-update",
            Strategy::SelectForUpdate => "select-for-update",
            Strategy::OptimisticVersioning => "optimistic-versioning",
        }
    }

    /// Performs one increment of the row at `key` within the session's
    /// current transaction. The caller commits or rolls back.
    pub fn apply<S: Session>(&self, session: &mut S, key: u64) -> Result<()> {
        match self {
            Strategy::ReadModifyWrite => naive::apply(session, key),
            Strategy::AtomicUpdate => atomic::apply(session, key),
            Strategy::SelectForUpdate => pessimistic::apply(session, key),
            Strategy::OptimisticVersioning => optimistic::apply(session, key),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| CounterError::BackendUnavailable(format!("unknown strategy: {s}")))
    }
}
