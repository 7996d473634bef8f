//! Counter held in one document of a document store.
//!
//! The [`DocumentCollection`] collaborator models a store exposing an atomic
//! find-and-update-with-increment primitive scoped to one document and
//! returning the post-update value - the single-document write guarantee is
//! what makes the backend safe under concurrency, not anything in this
//! adapter.
//!
//! [`LoopbackCollection`] is the in-process implementation used by the
//! facade defaults and the tests; a real client would implement the trait.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{CounterError, Result};
use crate::stores::CounterStore;

/// Document id the counter lives under.
const COUNTER_DOC: &str = "counter";

/// Collection with an atomic single-document increment primitive.
pub trait DocumentCollection: Send + Sync {
    /// Atomically adds one to the document's count field and returns the
    /// post-update value.
    fn find_and_increment(&self, id: &str) -> Result<u64>;

    /// Reads the document's count field.
    fn find_count(&self, id: &str) -> Result<u64>;

    /// Inserts the document with the given count if it does not exist.
    fn insert_if_absent(&self, id: &str, count: u64) -> Result<()>;
}

/// In-process collection: a mutex-guarded map of document id to count.
#[derive(Debug, Default)]
pub struct LoopbackCollection {
    docs: Mutex<HashMap<String, u64>>,
}

impl LoopbackCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentCollection for LoopbackCollection {
    fn find_and_increment(&self, id: &str) -> Result<u64> {
        let mut docs = self.docs();
        let count = docs
            .get_mut(id)
            .ok_or_else(|| CounterError::BackendUnavailable(format!("no document {id:?}")))?;
        *count += 1;
        Ok(*count)
    }

    fn find_count(&self, id: &str) -> Result<u64> {
        let docs = self.docs();
        docs.get(id)
            .copied()
            .ok_or_else(|| CounterError::BackendUnavailable(format!("no document {id:?}")))
    }

    fn insert_if_absent(&self, id: &str, count: u64) -> Result<()> {
        self.docs().entry(id.to_string()).or_insert(count);
        Ok(())
    }
}

/// Counter backend over a [`DocumentCollection`] collaborator.
pub struct DocumentStore<C: DocumentCollection> {
    collection: C,
}

impl<C: DocumentCollection> DocumentStore<C> {
    /// Wraps a collection collaborator.
    pub fn new(collection: C) -> Self {
        DocumentStore { collection }
    }
}

impl<C: DocumentCollection> CounterStore for DocumentStore<C> {
    /// Seeds the counter document at zero if absent.
    fn initialize(&self) -> Result<()> {
        self.collection.insert_if_absent(COUNTER_DOC, 0)
    }

    fn increment(&self) -> Result<u64> {
        self.collection.find_and_increment(COUNTER_DOC)
    }

    fn get_count(&self) -> Result<u64> {
        self.collection.find_count(COUNTER_DOC)
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
    fn test_initialize_idempotent() {
        let store = DocumentStore::new(LoopbackCollection::new());
        store.initialize().unwrap();
        store.increment().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.get_count().unwrap(), 1);
    }

    #[test]
    fn test_increment_before_initialize_fails() {
        let store = DocumentStore::new(LoopbackCollection::new());
        assert!(matches!(
            store.increment(),
            Err(CounterError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_increment_returns_post_update_value() {
        let store = DocumentStore::new(LoopbackCollection::new());
        store.initialize().unwrap();
        assert_eq!(store.increment().unwrap(), 1);
        assert_eq!(store.increment().unwrap(), 2);
        assert_eq!(store.get_count().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_exact() {
        let store = Arc::new(DocumentStore::new(LoopbackCollection::new()));
        store.initialize().unwrap();
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
