//! Pluggable atomic counter backends.
//!
//! Every backend implements the [`CounterStore`] capability interface -
//! `initialize` / `increment` / `get_count` / `close` - and guarantees that
//! `increment` adds exactly one and returns the new value, each variant with
//! its own mechanism and consistency contract:
//!
//! | Backend | Mechanism | Safe across |
//! |---------|-----------|-------------|
//! | [`in_memory::InMemoryStore`] | one mutex around the integer | threads of one process |
//! | [`file::FileStore`] | in-process lock + atomic rename | threads of one process, crash-safe on disk |
//! | [`relational::RelationalStore`] | server-side `count = count + 1` | any clients of the store |
//! | [`register::RegisterStore`] | linearizable distributed register | any processes/nodes |
//! | [`document::DocumentStore`] | single-document atomic increment | any clients of the store |
//! | [`wide_column::WideColumnStore`] | commutative counter column | any clients, eventually consistent reads |
//!
//! The three networked variants are written against small collaborator
//! traits ([`register::AtomicRegister`], [`document::DocumentCollection`],
//! [`wide_column::CounterColumnFamily`]); each module ships an in-process
//! loopback implementation so the facade, the harness and the tests run
//! without external services.
//!
//! Backends are selected by the closed [`BackendKind`] tag; process-wide
//! single instances are owned by [`crate::service::BackendRegistry`].

pub mod document;
pub mod file;
pub mod in_memory;
pub mod register;
pub mod relational;
pub mod wide_column;

use crate::error::{CounterError, Result};

/// Capability interface implemented by every counter backend.
///
/// Implementations are shared by all callers in-process, so every method
/// takes `&self` and must be safe for concurrent use (internal locking or
/// server-side atomicity).
pub trait CounterStore: Send + Sync {
    /// Idempotent setup: create the underlying schema/file/row if absent.
    ///
    /// Fails with [`BackendUnavailable`](CounterError::BackendUnavailable)
    /// if the underlying system cannot be reached; this is fatal to the
    /// caller and never retried internally.
    fn initialize(&self) -> Result<()>;

    /// Atomically adds one to the counter and returns the new value.
    fn increment(&self) -> Result<u64>;

    /// Reads the current value without side effects.
    fn get_count(&self) -> Result<u64>;

    /// Releases underlying connections/handles. Safe to call repeatedly.
    fn close(&self) -> Result<()>;
}

/// The closed set of backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Mutex-guarded integer in process memory.
    InMemory,
    /// Value persisted to a file with atomic replace on write.
    FileBacked,
    /// Relational row updated with a single atomic expression.
    RelationalRaw,
    /// Linearizable distributed atomic register.
    DistributedRegister,
    /// Document store with single-document atomic increments.
    DocumentAtomicUpdate,
    /// Wide-column counter column with commutative merges.
    WideColumnCounter,
}

impl BackendKind {
    /// Every backend, in catalog order.
    pub const ALL: [BackendKind; 6] = [
        BackendKind::InMemory,
        BackendKind::FileBacked,
        BackendKind::RelationalRaw,
        BackendKind::DistributedRegister,
        BackendKind::DocumentAtomicUpdate,
        BackendKind::WideColumnCounter,
    ];

    /// Stable name used on the selection surface.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::InMemory => "memory",
            BackendKind::FileBacked => "file",
            BackendKind::RelationalRaw => "relational",
            BackendKind::DistributedRegister => "register",
            BackendKind::DocumentAtomicUpdate => "document",
            BackendKind::WideColumnCounter => "wide-column",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self> {
        BackendKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CounterError::BackendUnavailable(format!("unknown backend: {s}")))
    }
}
