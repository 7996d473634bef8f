//! # Contesa - Correctness Under Contention for Shared Counters
//!
//! A Rust library for demonstrating and measuring what happens to a shared
//! mutable counter when many concurrent actors increment it: which
//! concurrency-control strategies keep it correct, which lose updates, and
//! by how much.
//!
//! ## The Problem
//!
//! The innocent-looking sequence *read the count, add one, write it back*
//! is broken under concurrency. Two writers that read the same value will
//! both write the same successor, and one increment vanishes without any
//! error being raised - the classic **lost update**. Depending on the
//! store and its isolation level the same staleness can instead surface as
//! an explicit **serialization failure**, which is a different phenomenon:
//! the increment was rejected, not silently swallowed, and can be retried.
//!
//! Measuring this correctly is its own concurrency problem: the harness
//! that drives the workers and the tracker that meters request throughput
//! must themselves be correct under contention while they quantify the
//! incorrectness of the strategy under test.
//!
//! ## The Catalog
//!
//! Four increment strategies run against a transactional store, each with a
//! different protection:
//!
//! | Strategy | Protection | Under contention |
//! |----------|------------|------------------|
//! | `read-modify-write` | none | loses updates (the negative baseline) |
//! | `atomic-update` | server-side `count = count + 1` | correct at any isolation level |
//! | `select-for-update` | exclusive row lock | correct, serialized on the lock |
//! | `optimistic-versioning` | version check at write time | correct, retries on conflict |
//!
//! Six counter backends implement the same capability interface
//! (`initialize` / `increment` / `get_count` / `close`), from a
//! mutex-guarded integer to a crash-safe file to adapters over relational,
//! distributed-register, document and wide-column collaborators.
//!
//! ## Quick Start
//!
//! Benchmark a strategy under contention:
//!
//! ```rust
//! use contesa::harness::{run_strategy, BenchConfig};
//! use contesa::strategies::Strategy;
//! use contesa::txn::memory::MemStore;
//!
//! let store = MemStore::new();
//! let config = BenchConfig::new(8, 1000);
//!
//! // The atomic expression never loses an update...
//! let report = run_strategy(&store, Strategy::AtomicUpdate, &config).unwrap();
//! assert_eq!(report.lost, 0);
//!
//! // ...while the naive baseline usually does.
//! let report = run_strategy(&store, Strategy::ReadModifyWrite, &config).unwrap();
//! println!("lost {} of {} increments", report.lost, report.expected);
//! ```
//!
//! Serve a counter with request-rate statistics:
//!
//! ```rust
//! use contesa::service::{BackendRegistry, CounterService};
//! use contesa::stores::BackendKind;
//!
//! let registry = BackendRegistry::new();
//! let service = CounterService::new(&registry, BackendKind::InMemory).unwrap();
//!
//! service.increment().unwrap();
//! let stats = service.stats();
//! assert_eq!(stats.total_requests, 1);
//! ```
//!
//! ## Concurrency Contract
//!
//! - Workers run as plain OS threads; each worker's increments are strictly
//!   sequential within itself, and no ordering is guaranteed (or needed)
//!   across workers.
//! - The harness joins every worker before reading the final count; that
//!   join is the single synchronization point of a run.
//! - Each shared structure is guarded by exactly one lock (the in-memory
//!   counter, the tracker's sample sequence), and no in-process lock is
//!   held across a store's blocking call.
//! - A worker that exhausts its retry budget logs the failure and moves on;
//!   it never cancels its siblings.
//!
//! ## Error Taxonomy
//!
//! | Error | Meaning | Treatment |
//! |-------|---------|-----------|
//! | `BackendUnavailable` | setup/connection failure | fatal, never retried |
//! | `SerializationFailure`, `LockTimeout` | store rejected the transaction | retried when enabled |
//! | `OptimisticConflictExhausted` | version race lost 100 times | fatal for that increment |
//! | race loss | not an error | visible only as `BenchReport::lost > 0` |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `table` | Render benchmark reports as ASCII tables via [`report`] |
//! | `json` | JSON serialization helpers via `serde_json` |
//! | `full` | All of the above |
//! | `demo` | The `demo` example binary (clap + tracing-subscriber) |

pub mod error;
pub mod harness;
pub mod retry;
pub mod service;
pub mod stores;
pub mod strategies;
pub mod tracker;
pub mod txn;

#[cfg(feature = "table")]
pub mod report;
