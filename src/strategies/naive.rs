//! Naive read-modify-write increment.
//!
//! Reads the count, adds one in the caller, writes it back. Nothing prevents
//! another writer from committing between the read and the write, so under
//! concurrent execution this strategy reliably loses updates. It exists as
//! the negative baseline whose loss the benchmark harness measures.
//!
//! Under serializable isolation the same staleness surfaces differently: the
//! store rejects the losing commit with a serialization failure instead of
//! silently discarding the increment.

use crate::error::Result;
use crate::txn::Session;

/// One unprotected read-modify-write increment of the row at `key`.
pub fn apply<S: Session>(session: &mut S, key: u64) -> Result<()> {
    let row = session.select(key)?;
    session.update_count(key, row.count + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::{memory::MemStore, TransactionalStore};

    #[test]
    fn test_sequential_increments_are_exact() {
        let store = MemStore::new();
        let mut session = store.session().unwrap();
        session.upsert_row(1, 0, 0).unwrap();
        session.commit().unwrap();

        for _ in 0..5 {
            apply(&mut session, 1).unwrap();
            session.commit().unwrap();
        }
        assert_eq!(session.select(1).unwrap().count, 5);
    }

    #[test]
    fn test_interleaved_transactions_lose_an_update() {
        let store = MemStore::new();
        let mut setup = store.session().unwrap();
        setup.upsert_row(1, 0, 0).unwrap();
        setup.commit().unwrap();

        let mut s1 = store.session().unwrap();
        let mut s2 = store.session().unwrap();

        // Both transactions read before either commits.
        let r1 = s1.select(1).unwrap();
        let r2 = s2.select(1).unwrap();
        s1.update_count(1, r1.count + 1).unwrap();
        s1.commit().unwrap();
        s2.update_count(1, r2.count + 1).unwrap();
        s2.commit().unwrap();

        // Two increments, one survivor.
        let mut check = store.session().unwrap();
        assert_eq!(check.select(1).unwrap().count, 1);
    }
}
