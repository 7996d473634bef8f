//! Counter delegated to a distributed atomic register.
//!
//! The [`AtomicRegister`] collaborator models a named integer register whose
//! `increment_and_get`, `get` and `set` are linearizable across the cluster,
//! the way a distributed coordination service's CP subsystem exposes one.
//! The backend adds nothing on top: safety across any number of concurrent
//! processes comes entirely from the register primitive.
//!
//! [`LoopbackRegister`] is the in-process implementation used by the facade
//! defaults and the tests; a cluster client would implement the same trait.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::stores::CounterStore;

/// Named atomic integer register, linearizable across its deployment.
pub trait AtomicRegister: Send + Sync {
    /// Atomically adds one and returns the new value.
    fn increment_and_get(&self) -> Result<u64>;

    /// Reads the current value.
    fn get(&self) -> Result<u64>;

    /// Overwrites the value.
    fn set(&self, value: u64) -> Result<()>;
}

/// In-process register: a single atomic integer with sequentially
/// consistent operations, trivially linearizable within one process.
#[derive(Debug, Default)]
pub struct LoopbackRegister {
    value: AtomicU64,
}

impl LoopbackRegister {
    /// Creates a register holding zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AtomicRegister for LoopbackRegister {
    fn increment_and_get(&self) -> Result<u64> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn get(&self) -> Result<u64> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    fn set(&self, value: u64) -> Result<()> {
        self.value.store(value, Ordering::SeqCst);
        Ok(())
    }
}

/// Counter backend over an [`AtomicRegister`] collaborator.
pub struct RegisterStore<R: AtomicRegister> {
    register: R,
}

impl<R: AtomicRegister> RegisterStore<R> {
    /// Wraps a register collaborator.
    pub fn new(register: R) -> Self {
        RegisterStore { register }
    }
}

impl<R: AtomicRegister> CounterStore for RegisterStore<R> {
    /// The register exists by name on the other side; nothing to create.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn increment(&self) -> Result<u64> {
        self.register.increment_and_get()
    }

    fn get_count(&self) -> Result<u64> {
        self.register.get()
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
    fn test_increment_returns_new_value() {
        let store = RegisterStore::new(LoopbackRegister::new());
        store.initialize().unwrap();
        assert_eq!(store.increment().unwrap(), 1);
        assert_eq!(store.increment().unwrap(), 2);
        assert_eq!(store.get_count().unwrap(), 2);
    }

    #[test]
    fn test_set_resets_register() {
        let register = LoopbackRegister::new();
        register.increment_and_get().unwrap();
        register.set(0).unwrap();
        assert_eq!(register.get().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_increments_are_exact() {
        let store = Arc::new(RegisterStore::new(LoopbackRegister::new()));
        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    store.increment().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_count().unwrap(), 8000);
    }
}
