//! Counter in a wide-column store's counter-typed column.
//!
//! The [`CounterColumnFamily`] collaborator models a column whose values
//! commutatively merge increments at the storage layer: concurrent `add`
//! operations never lose each other, but a read may trail concurrent
//! increments depending on the backend's replication settings.
//!
//! `increment()` therefore performs a follow-up read after the write and
//! returns that value, documenting the eventual-consistency caveat instead
//! of returning a meaningless placeholder.
//!
//! [`LoopbackColumnFamily`] is the in-process implementation used by the
//! facade defaults and the tests; it is immediately consistent, so tests
//! can assert exact totals.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::stores::CounterStore;

/// Row key the counter column lives under.
const COUNTER_ROW: &str = "counter";

/// Column family with commutative counter-column increments.
pub trait CounterColumnFamily: Send + Sync {
    /// Adds `delta` to the counter column of `key`; increments from any
    /// number of writers merge commutatively.
    fn add(&self, key: &str, delta: u64) -> Result<()>;

    /// Reads the counter column of `key`; an absent row reads as zero.
    ///
    /// May lag concurrent increments on replicated deployments.
    fn read(&self, key: &str) -> Result<u64>;
}

/// In-process column family: a mutex-guarded map, immediately consistent.
#[derive(Debug, Default)]
pub struct LoopbackColumnFamily {
    columns: Mutex<HashMap<String, u64>>,
}

impl LoopbackColumnFamily {
    /// Creates an empty column family.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterColumnFamily for LoopbackColumnFamily {
    fn add(&self, key: &str, delta: u64) -> Result<()> {
        let mut columns = self.columns.lock().unwrap_or_else(PoisonError::into_inner);
        *columns.entry(key.to_string()).or_insert(0) += delta;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<u64> {
        let columns = self.columns.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(columns.get(key).copied().unwrap_or(0))
    }
}

/// Counter backend over a [`CounterColumnFamily`] collaborator.
pub struct WideColumnStore<F: CounterColumnFamily> {
    family: F,
}

impl<F: CounterColumnFamily> WideColumnStore<F> {
    /// Wraps a column family collaborator.
    pub fn new(family: F) -> Self {
        WideColumnStore { family }
    }
}

impl<F: CounterColumnFamily> CounterStore for WideColumnStore<F> {
    /// Counter columns start at zero implicitly; nothing to create.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Adds one, then reads the column back and returns that value.
    ///
    /// On a replicated deployment the follow-up read may not yet observe
    /// increments committed by other writers, so the returned value is a
    /// lower bound on the converged count rather than an exact post-update
    /// value.
    fn increment(&self) -> Result<u64> {
        self.family.add(COUNTER_ROW, 1)?;
        self.family.read(COUNTER_ROW)
    }

    fn get_count(&self) -> Result<u64> {
        self.family.read(COUNTER_ROW)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_absent_row_reads_zero() {
        let store = WideColumnStore::new(LoopbackColumnFamily::new());
        store.initialize().unwrap();
        assert_eq!(store.get_count().unwrap(), 0);
    }

    #[test]
    fn test_increment_returns_read_back_value() {
        let store = WideColumnStore::new(LoopbackColumnFamily::new());
        assert_eq!(store.increment().unwrap(), 1);
        assert_eq!(store.increment().unwrap(), 2);
        assert_eq!(store.get_count().unwrap(), 2);
    }

    #[test]
    fn test_commutative_adds_never_lose() {
        let store = Arc::new(WideColumnStore::new(LoopbackColumnFamily::new()));
        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    store.increment().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_count().unwrap(), 4000);
    }
}
