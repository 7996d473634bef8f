//! Counter row in a relational store, updated with one atomic expression.
//!
//! Every increment issues a single `count = count + 1` statement scoped to
//! one row and commits it. There is no separate read step, so the backend is
//! immune to the lost-update race under any isolation level that guarantees
//! atomic single-statement visibility - the store computes the new value
//! server-side.

use crate::error::{CounterError, Result};
use crate::stores::CounterStore;
use crate::txn::{Session, TransactionalStore};

/// Row key the counter lives under.
const COUNTER_KEY: u64 = 1;

/// Counter backend over a [`TransactionalStore`] collaborator.
pub struct RelationalStore<T: TransactionalStore> {
    store: T,
    key: u64,
}

impl<T: TransactionalStore> RelationalStore<T> {
    /// Wraps a transactional store, using the default singleton row key.
    pub fn new(store: T) -> Self {
        RelationalStore {
            store,
            key: COUNTER_KEY,
        }
    }

    /// Wraps a transactional store with an explicit row key.
    pub fn with_key(store: T, key: u64) -> Self {
        RelationalStore { store, key }
    }
}

impl<T: TransactionalStore> CounterStore for RelationalStore<T> {
    /// Creates the counter row at zero if absent; an existing row is left
    /// untouched.
    fn initialize(&self) -> Result<()> {
        let mut session = self.store.session()?;
        match session.select(self.key) {
            Ok(_) => Ok(()),
            Err(CounterError::MissingRow { .. }) => {
                session.upsert_row(self.key, 0, 0)?;
                session.commit()?;
                tracing::info!(key = self.key, "counter row created");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn increment(&self) -> Result<u64> {
        let mut session = self.store.session()?;
        let value = session.increment_in_place(self.key)?;
        session.commit()?;
        Ok(value)
    }

    fn get_count(&self) -> Result<u64> {
        let mut session = self.store.session()?;
        Ok(session.select(self.key)?.count)
    }

    /// Sessions are per-operation; nothing held open.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
