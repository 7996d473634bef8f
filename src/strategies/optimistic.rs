//! Optimistic versioned increment.
//!
//! Reads `{count, version}`, then writes `{count + 1, version + 1}` guarded
//! by `WHERE version = <observed>`. Zero rows affected means another writer
//! committed in between; the strategy retries from a fresh read. The retry
//! budget is bounded: exhausting it fails the increment with
//! [`OptimisticConflictExhausted`](crate::error::CounterError) rather than
//! spinning forever or silently skipping the update.

use crate::error::{CounterError, Result};
use crate::txn::Session;

/// Attempts before an increment gives up on winning the version race.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// One version-guarded increment of the row at `key`, with the default
/// attempt budget.
pub fn apply<S: Session>(session: &mut S, key: u64) -> Result<()> {
    apply_with_budget(session, key, DEFAULT_MAX_ATTEMPTS)
}

/// One version-guarded increment of the row at `key`, giving up after
/// `max_attempts` consecutive version mismatches.
pub fn apply_with_budget<S: Session>(session: &mut S, key: u64, max_attempts: u32) -> Result<()> {
    for attempt in 1..=max_attempts {
        let row = session.select(key)?;
        let applied =
            session.update_if_version(key, row.count + 1, row.version + 1, row.version)?;
        if applied {
            return Ok(());
        }
        tracing::debug!(key, attempt, max_attempts, "version mismatch, re-reading");
    }
    Err(CounterError::OptimisticConflictExhausted {
        attempts: max_attempts,
    })
}
