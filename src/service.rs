//! Counter-serving facade and backend registry.
//!
//! [`BackendRegistry`] owns the process-wide single instance of each backend:
//! a store is constructed and initialized lazily on the first request for its
//! [`BackendKind`], every later request returns the same instance, and
//! [`close_all`](BackendRegistry::close_all) tears everything down at process
//! shutdown. Consumers receive the instance by handle - there is no
//! module-level shared state to reach around the registry.
//!
//! [`CounterService`] composes one backend with a [`RequestTracker`] and
//! exposes the three operations an external transport (HTTP, RPC) serves:
//! increment, read, and throughput statistics. Only increments are tracked,
//! matching a deployment that meters its write endpoint.
//!
//! # Example
//!
//! ```rust
//! use contesa::service::{BackendRegistry, CounterService};
//! use contesa::stores::BackendKind;
//!
//! let registry = BackendRegistry::new();
//! let service = CounterService::new(&registry, BackendKind::InMemory).unwrap();
//!
//! assert_eq!(service.increment().unwrap().count, 1);
//! assert_eq!(service.get_count().unwrap().count, 1);
//! assert_eq!(service.stats().total_requests, 1);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stores::document::{DocumentStore, LoopbackCollection};
use crate::stores::file::FileStore;
use crate::stores::in_memory::InMemoryStore;
use crate::stores::register::{LoopbackRegister, RegisterStore};
use crate::stores::relational::RelationalStore;
use crate::stores::wide_column::{LoopbackColumnFamily, WideColumnStore};
use crate::stores::{BackendKind, CounterStore};
use crate::tracker::{RequestTracker, RpsStats};
use crate::txn::memory::MemStore;

/// Default file the file-backed backend persists to.
const DEFAULT_COUNTER_FILE: &str = "counter.txt";

/// Payload returned by the increment and read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    /// The counter value after the operation.
    pub count: u64,
}

/// Process-wide owner of backend instances.
///
/// Constructed once and passed by reference to every consumer; replaces
/// implicit global singletons with explicit ownership.
pub struct BackendRegistry {
    stores: Mutex<HashMap<BackendKind, Arc<dyn CounterStore>>>,
    counter_file: PathBuf,
}

impl BackendRegistry {
    /// Creates an empty registry using the default counter file path for
    /// the file-backed backend.
    pub fn new() -> Self {
        Self::with_counter_file(DEFAULT_COUNTER_FILE)
    }

    /// Creates an empty registry persisting the file-backed backend to
    /// `path`.
    pub fn with_counter_file(path: impl Into<PathBuf>) -> Self {
        BackendRegistry {
            stores: Mutex::new(HashMap::new()),
            counter_file: path.into(),
        }
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<BackendKind, Arc<dyn CounterStore>>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Injects a concrete store for `kind`, replacing the default
    /// construction - the seam for real cluster/document/column clients.
    ///
    /// The store must already be initialized.
    pub fn register(&self, kind: BackendKind, store: Arc<dyn CounterStore>) {
        self.stores().insert(kind, store);
    }

    /// Returns the process-wide instance for `kind`, constructing and
    /// initializing it on first use.
    ///
    /// Initialization failure is fatal and surfaces immediately; nothing is
    /// cached for a backend that failed to come up.
    pub fn store(&self, kind: BackendKind) -> Result<Arc<dyn CounterStore>> {
        let mut stores = self.stores();
        if let Some(store) = stores.get(&kind) {
            return Ok(Arc::clone(store));
        }
        let store = self.build(kind)?;
        tracing::info!(backend = %kind, "backend initialized");
        stores.insert(kind, Arc::clone(&store));
        Ok(store)
    }

    fn build(&self, kind: BackendKind) -> Result<Arc<dyn CounterStore>> {
        let store: Arc<dyn CounterStore> = match kind {
            BackendKind::InMemory => Arc::new(InMemoryStore::new()),
            BackendKind::FileBacked => Arc::new(FileStore::new(&self.counter_file)),
            BackendKind::RelationalRaw => Arc::new(RelationalStore::new(MemStore::new())),
            BackendKind::DistributedRegister => {
                Arc::new(RegisterStore::new(LoopbackRegister::new()))
            }
            BackendKind::DocumentAtomicUpdate => {
                Arc::new(DocumentStore::new(LoopbackCollection::new()))
            }
            BackendKind::WideColumnCounter => {
                Arc::new(WideColumnStore::new(LoopbackColumnFamily::new()))
            }
        };
        store.initialize()?;
        Ok(store)
    }

    /// Closes every constructed backend. Safe to call repeatedly; stores
    /// remain registered, and `close` itself is idempotent per backend.
    pub fn close_all(&self) -> Result<()> {
        for (kind, store) in self.stores().iter() {
            store.close()?;
            tracing::info!(backend = %kind, "backend closed");
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Increment/read/stats facade over one selected backend.
pub struct CounterService {
    store: Arc<dyn CounterStore>,
    tracker: RequestTracker,
}

impl CounterService {
    /// Builds a service over the registry's instance of `kind`.
    pub fn new(registry: &BackendRegistry, kind: BackendKind) -> Result<Self> {
        Ok(Self::from_store(registry.store(kind)?))
    }

    /// Builds a service over an explicit store handle.
    pub fn from_store(store: Arc<dyn CounterStore>) -> Self {
        CounterService {
            store,
            tracker: RequestTracker::new(),
        }
    }

    /// Increments the counter, records the request, and returns the new
    /// value.
    pub fn increment(&self) -> Result<CountResponse> {
        let count = self.store.increment()?;
        self.tracker.record();
        tracing::info!(count, "counter incremented");
        Ok(CountResponse { count })
    }

    /// Reads the current counter value.
    pub fn get_count(&self) -> Result<CountResponse> {
        let count = self.store.get_count()?;
        tracing::info!(count, "counter value retrieved");
        Ok(CountResponse { count })
    }

    /// Throughput statistics over the increments served so far.
    pub fn stats(&self) -> RpsStats {
        self.tracker.compute_stats()
    }
}
