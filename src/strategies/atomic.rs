//! Atomic expression increment.
//!
//! Issues a single `count = count + 1` statement; the store computes the new
//! value server-side within one atomic statement, so there is no read the
//! caller could act on stale. Correct under any isolation level.

use crate::error::Result;
use crate::txn::Session;

/// One server-side increment of the row at `key`.
pub fn apply<S: Session>(session: &mut S, key: u64) -> Result<()> {
    session.increment_in_place(key)?;
    Ok(())
}
