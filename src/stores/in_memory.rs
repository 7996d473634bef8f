//! Counter held in process memory behind one mutex.
//!
//! The simplest backend: a single mutual-exclusion lock guards the integer,
//! making increments effectively linearizable - but only for threads of this
//! one process. Restarting the process resets the count.

use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::stores::CounterStore;

/// Mutex-guarded in-process counter.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    count: Mutex<u64>,
}

impl InMemoryStore {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CounterStore for InMemoryStore {
    /// Nothing to set up; always succeeds.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn increment(&self) -> Result<u64> {
        let mut count = self.lock();
        *count += 1;
        Ok(*count)
    }

    fn get_count(&self) -> Result<u64> {
        Ok(*self.lock())
    }

    /// Nothing to release.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
