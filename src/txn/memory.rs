//! In-process transactional store with real transaction semantics.
//!
//! [`MemStore`] implements the [`TransactionalStore`] boundary entirely in
//! memory while preserving the behaviors the strategy catalog is built to
//! demonstrate:
//!
//! - statements read the latest **committed** data; writes stay private to
//!   their session until commit,
//! - every write acquires an exclusive row lock held until the transaction
//!   ends, so competing writers queue exactly as they do on a real server,
//! - under [`IsolationLevel::Serializable`], commit validates that no row
//!   read by the transaction was changed by a concurrent commit
//!   (first committer wins; the loser gets a
//!   [`SerializationFailure`](CounterError::SerializationFailure)).
//!
//! This is enough to make the naive read-modify-write strategy genuinely
//! lose updates under `ReadCommitted`, and genuinely fail with serialization
//! errors under `Serializable`, with nothing mocked.
//!
//! # Example
//!
//! ```rust
//! use contesa::txn::{memory::MemStore, Session, TransactionalStore};
//!
//! let store = MemStore::new();
//! let mut session = store.session().unwrap();
//! session.upsert_row(1, 0, 0).unwrap();
//! session.commit().unwrap();
//!
//! let value = session.increment_in_place(1).unwrap();
//! session.commit().unwrap();
//! assert_eq!(value, 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{CounterError, Result};
use crate::txn::{CounterRow, IsolationLevel, Session, TransactionalStore};

/// Default time a statement waits for a row lock before giving up.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

struct Row {
    count: u64,
    version: u64,
    /// Bumped on every committed write; used for serializable validation.
    stamp: u64,
    /// Session currently holding this row's exclusive lock.
    locked_by: Option<u64>,
}

type Table = HashMap<u64, Row>;

struct Inner {
    table: Mutex<Table>,
    lock_released: Condvar,
    /// Encoded [`IsolationLevel`]; applies to sessions opened afterwards.
    isolation: AtomicU8,
    next_session_id: AtomicU64,
    lock_timeout: Duration,
}

impl Inner {
    fn table(&self) -> MutexGuard<'_, Table> {
        // A worker panicking mid-transaction must not poison the store.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory [`TransactionalStore`] implementation.
///
/// Share it across workers behind a reference or an `Arc`; every
/// [`session`](TransactionalStore::session) call opens an independent
/// transaction context.
pub struct MemStore {
    inner: Arc<Inner>,
}

impl MemStore {
    /// Creates an empty store with the default lock wait budget (5 seconds)
    /// and `ReadCommitted` isolation.
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store with a custom lock wait budget.
    ///
    /// Tests use short budgets to exercise
    /// [`LockTimeout`](CounterError::LockTimeout) quickly.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        MemStore {
            inner: Arc::new(Inner {
                table: Mutex::new(HashMap::new()),
                lock_released: Condvar::new(),
                isolation: AtomicU8::new(0),
                next_session_id: AtomicU64::new(1),
                lock_timeout,
            }),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_isolation(level: IsolationLevel) -> u8 {
    match level {
        IsolationLevel::ReadCommitted => 0,
        IsolationLevel::Serializable => 1,
    }
}

fn decode_isolation(raw: u8) -> IsolationLevel {
    if raw == 0 {
        IsolationLevel::ReadCommitted
    } else {
        IsolationLevel::Serializable
    }
}

impl TransactionalStore for MemStore {
    type Session = MemSession;

    fn session(&self) -> Result<MemSession> {
        let id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        Ok(MemSession {
            inner: Arc::clone(&self.inner),
            id,
            isolation: decode_isolation(self.inner.isolation.load(Ordering::Relaxed)),
            reads: HashMap::new(),
            pending: HashMap::new(),
            locked: HashSet::new(),
        })
    }

    fn set_isolation(&self, level: IsolationLevel) {
        self.inner
            .isolation
            .store(encode_isolation(level), Ordering::Relaxed);
        tracing::info!(level = %level, "isolation level set");
    }

    fn isolation(&self) -> IsolationLevel {
        decode_isolation(self.inner.isolation.load(Ordering::Relaxed))
    }
}

/// One open connection to a [`MemStore`].
///
/// The isolation level is captured when the session is opened, like a server
/// default picked up by a new connection.
pub struct MemSession {
    inner: Arc<Inner>,
    id: u64,
    isolation: IsolationLevel,
    /// Row stamps observed by this transaction's first read of each key.
    reads: HashMap<u64, u64>,
    /// Uncommitted writes, applied atomically at commit.
    pending: HashMap<u64, CounterRow>,
    /// Keys whose exclusive row lock this session holds.
    locked: HashSet<u64>,
}

/// Acquires the exclusive lock on `key` for session `id`, waiting while
/// another session holds it. The row must exist.
fn acquire_lock<'a>(
    inner: &'a Inner,
    id: u64,
    locked: &mut HashSet<u64>,
    mut table: MutexGuard<'a, Table>,
    key: u64,
) -> Result<MutexGuard<'a, Table>> {
    let deadline = Instant::now() + inner.lock_timeout;
    loop {
        let row = table.get_mut(&key).ok_or(CounterError::MissingRow { key })?;
        match row.locked_by {
            None => {
                row.locked_by = Some(id);
                locked.insert(key);
                return Ok(table);
            }
            Some(holder) if holder == id => return Ok(table),
            Some(_) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(CounterError::LockTimeout { key });
                }
                let (guard, _timed_out) = inner
                    .lock_released
                    .wait_timeout(table, remaining)
                    .unwrap_or_else(PoisonError::into_inner);
                table = guard;
            }
        }
    }
}

/// Row content as the transaction sees it: its own pending write if any,
/// otherwise the committed row.
fn visible_row(pending: &HashMap<u64, CounterRow>, table: &Table, key: u64) -> Result<CounterRow> {
    if let Some(write) = pending.get(&key) {
        return Ok(*write);
    }
    let row = table.get(&key).ok_or(CounterError::MissingRow { key })?;
    Ok(CounterRow {
        count: row.count,
        version: row.version,
    })
}

/// Records the stamp of the transaction's first read of `key`; only
/// serializable sessions validate these at commit.
fn note_read(
    reads: &mut HashMap<u64, u64>,
    isolation: IsolationLevel,
    table: &Table,
    key: u64,
) {
    if isolation == IsolationLevel::Serializable {
        if let Some(row) = table.get(&key) {
            reads.entry(key).or_insert(row.stamp);
        }
    }
}

/// Releases every row lock held by session `id`. Callers must notify
/// waiters afterwards.
fn release_locks(locked: &mut HashSet<u64>, id: u64, table: &mut Table) {
    for key in locked.drain() {
        if let Some(row) = table.get_mut(&key) {
            if row.locked_by == Some(id) {
                row.locked_by = None;
            }
        }
    }
}

impl Session for MemSession {
    fn select(&mut self, key: u64) -> Result<CounterRow> {
        let table = self.inner.table();
        let row = visible_row(&self.pending, &table, key)?;
        note_read(&mut self.reads, self.isolation, &table, key);
        Ok(row)
    }

    fn select_for_update(&mut self, key: u64) -> Result<CounterRow> {
        let table = self.inner.table();
        let table = acquire_lock(&self.inner, self.id, &mut self.locked, table, key)?;
        // Read after the lock is held, so the observed stamp is current.
        let row = visible_row(&self.pending, &table, key)?;
        note_read(&mut self.reads, self.isolation, &table, key);
        Ok(row)
    }

    fn update_count(&mut self, key: u64, count: u64) -> Result<()> {
        let table = self.inner.table();
        let table = acquire_lock(&self.inner, self.id, &mut self.locked, table, key)?;
        let current = visible_row(&self.pending, &table, key)?;
        drop(table);
        self.pending.insert(
            key,
            CounterRow {
                count,
                version: current.version,
            },
        );
        Ok(())
    }

    fn update_if_version(
        &mut self,
        key: u64,
        count: u64,
        version: u64,
        expected_version: u64,
    ) -> Result<bool> {
        let table = self.inner.table();
        let table = acquire_lock(&self.inner, self.id, &mut self.locked, table, key)?;
        // Like a server's UPDATE, the predicate is evaluated against the
        // latest row once the lock is held.
        let current = visible_row(&self.pending, &table, key)?;
        drop(table);
        if current.version != expected_version {
            return Ok(false);
        }
        self.pending.insert(key, CounterRow { count, version });
        Ok(true)
    }

    fn increment_in_place(&mut self, key: u64) -> Result<u64> {
        let table = self.inner.table();
        let table = acquire_lock(&self.inner, self.id, &mut self.locked, table, key)?;
        let current = visible_row(&self.pending, &table, key)?;
        drop(table);
        let new_count = current.count + 1;
        self.pending.insert(
            key,
            CounterRow {
                count: new_count,
                version: current.version,
            },
        );
        Ok(new_count)
    }

    fn upsert_row(&mut self, key: u64, count: u64, version: u64) -> Result<()> {
        let mut table = self.inner.table();
        table.entry(key).or_insert(Row {
            count: 0,
            version: 0,
            stamp: 0,
            locked_by: None,
        });
        let table = acquire_lock(&self.inner, self.id, &mut self.locked, table, key)?;
        drop(table);
        self.pending.insert(key, CounterRow { count, version });
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut table = self.inner.table();

        if self.isolation == IsolationLevel::Serializable {
            let conflict = self.reads.iter().find_map(|(&key, &stamp)| {
                match table.get(&key) {
                    Some(row) if row.stamp == stamp => None,
                    _ => Some(key),
                }
            });
            if let Some(key) = conflict {
                tracing::debug!(session = self.id, key, "serializable commit rejected");
                self.pending.clear();
                self.reads.clear();
                release_locks(&mut self.locked, self.id, &mut table);
                drop(table);
                self.inner.lock_released.notify_all();
                return Err(CounterError::SerializationFailure { key });
            }
        }

        for (key, write) in self.pending.drain() {
            if let Some(row) = table.get_mut(&key) {
                row.count = write.count;
                row.version = write.version;
                row.stamp += 1;
            }
        }
        self.reads.clear();
        release_locks(&mut self.locked, self.id, &mut table);
        drop(table);
        self.inner.lock_released.notify_all();
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let mut table = self.inner.table();
        self.pending.clear();
        self.reads.clear();
        release_locks(&mut self.locked, self.id, &mut table);
        drop(table);
        self.inner.lock_released.notify_all();
        Ok(())
    }
}

impl Drop for MemSession {
    /// An abandoned session must not keep its row locks.
    fn drop(&mut self) {
        if !self.locked.is_empty() || !self.pending.is_empty() {
            let _ = self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn store_with_row(key: u64) -> MemStore {
        let store = MemStore::new();
        let mut session = store.session().unwrap();
        session.upsert_row(key, 0, 0).unwrap();
        session.commit().unwrap();
        store
    }

    #[test]
    fn test_select_missing_row() {
        let store = MemStore::new();
        let mut session = store.session().unwrap();
        assert!(matches!(
            session.select(9),
            Err(CounterError::MissingRow { key: 9 })
        ));
    }

    #[test]
    fn test_upsert_and_select() {
        let store = store_with_row(1);
        let mut session = store.session().unwrap();
        assert_eq!(session.select(1).unwrap(), CounterRow { count: 0, version: 0 });
    }

    #[test]
    fn test_writes_invisible_until_commit() {
        let store = store_with_row(1);
        let mut writer = store.session().unwrap();
        let mut reader = store.session().unwrap();

        writer.update_count(1, 41).unwrap();
        assert_eq!(reader.select(1).unwrap().count, 0);

        writer.commit().unwrap();
        assert_eq!(reader.select(1).unwrap().count, 41);
    }

    #[test]
    fn test_read_your_own_write() {
        let store = store_with_row(1);
        let mut session = store.session().unwrap();
        session.update_count(1, 10).unwrap();
        assert_eq!(session.select(1).unwrap().count, 10);
        session.rollback().unwrap();
        assert_eq!(session.select(1).unwrap().count, 0);
    }

    #[test]
    fn test_increment_in_place_returns_new_value() {
        let store = store_with_row(1);
        let mut session = store.session().unwrap();
        assert_eq!(session.increment_in_place(1).unwrap(), 1);
        session.commit().unwrap();
        assert_eq!(session.increment_in_place(1).unwrap(), 2);
        session.commit().unwrap();
    }

    #[test]
    fn test_lost_update_interleaving_read_committed() {
        // Two transactions read the same committed value; the second commit
        // overwrites the first without incorporating it.
        let store = store_with_row(1);
        let mut s1 = store.session().unwrap();
        let mut s2 = store.session().unwrap();

        let v1 = s1.select(1).unwrap().count;
        let v2 = s2.select(1).unwrap().count;
        s1.update_count(1, v1 + 1).unwrap();
        s1.commit().unwrap();
        s2.update_count(1, v2 + 1).unwrap();
        s2.commit().unwrap();

        let mut check = store.session().unwrap();
        // Two increments, final value 1: one update was lost.
        assert_eq!(check.select(1).unwrap().count, 1);
    }

    #[test]
    fn test_serializable_rejects_stale_commit() {
        let store = store_with_row(1);
        store.set_isolation(IsolationLevel::Serializable);
        let mut s1 = store.session().unwrap();
        let mut s2 = store.session().unwrap();

        let v1 = s1.select(1).unwrap().count;
        let v2 = s2.select(1).unwrap().count;
        s1.update_count(1, v1 + 1).unwrap();
        s1.commit().unwrap();
        s2.update_count(1, v2 + 1).unwrap();
        let err = s2.commit().unwrap_err();
        assert!(matches!(err, CounterError::SerializationFailure { key: 1 }));

        // The loser rolled back; a fresh transaction sees the winner's value.
        let mut check = store.session().unwrap();
        assert_eq!(check.select(1).unwrap().count, 1);
    }

    #[test]
    fn test_serializable_retry_succeeds_after_failure() {
        let store = store_with_row(1);
        store.set_isolation(IsolationLevel::Serializable);
        let mut s1 = store.session().unwrap();
        let mut s2 = store.session().unwrap();

        let v1 = s1.select(1).unwrap().count;
        let _ = s2.select(1).unwrap();
        s1.update_count(1, v1 + 1).unwrap();
        s1.commit().unwrap();
        s2.update_count(1, 99).unwrap();
        assert!(s2.commit().is_err());

        // Same session, new transaction: fresh read, clean commit.
        let v2 = s2.select(1).unwrap().count;
        s2.update_count(1, v2 + 1).unwrap();
        s2.commit().unwrap();

        let mut check = store.session().unwrap();
        assert_eq!(check.select(1).unwrap().count, 2);
    }

    #[test]
    fn test_update_if_version_mismatch_affects_zero_rows() {
        let store = store_with_row(1);
        let mut s1 = store.session().unwrap();
        let mut s2 = store.session().unwrap();

        let row = s1.select(1).unwrap();
        assert!(s1
            .update_if_version(1, row.count + 1, row.version + 1, row.version)
            .unwrap());
        s1.commit().unwrap();

        // s2 still holds the old version; its conditional update misses.
        assert!(!s2.update_if_version(1, 100, 1, 0).unwrap());
        s2.commit().unwrap();

        let mut check = store.session().unwrap();
        assert_eq!(check.select(1).unwrap(), CounterRow { count: 1, version: 1 });
    }

    #[test]
    fn test_select_for_update_blocks_competing_writer() {
        let store = Arc::new(store_with_row(1));
        let mut holder = store.session().unwrap();
        holder.select_for_update(1).unwrap();

        let contender_store = Arc::clone(&store);
        let contender = thread::spawn(move || {
            let mut session = contender_store.session().unwrap();
            let row = session.select_for_update(1).unwrap();
            session.update_count(1, row.count + 1).unwrap();
            session.commit().unwrap();
        });

        // The contender cannot proceed until the holder commits.
        thread::sleep(Duration::from_millis(50));
        holder.update_count(1, 10).unwrap();
        holder.commit().unwrap();
        contender.join().unwrap();

        let mut check = store.session().unwrap();
        assert_eq!(check.select(1).unwrap().count, 11);
    }

    #[test]
    fn test_lock_timeout() {
        let store = MemStore::with_lock_timeout(Duration::from_millis(20));
        let mut init = store.session().unwrap();
        init.upsert_row(1, 0, 0).unwrap();
        init.commit().unwrap();

        let mut holder = store.session().unwrap();
        holder.select_for_update(1).unwrap();

        let mut waiter = store.session().unwrap();
        assert!(matches!(
            waiter.select_for_update(1),
            Err(CounterError::LockTimeout { key: 1 })
        ));
    }

    #[test]
    fn test_drop_releases_locks() {
        let store = store_with_row(1);
        {
            let mut holder = store.session().unwrap();
            holder.select_for_update(1).unwrap();
            holder.update_count(1, 42).unwrap();
            // Dropped without commit.
        }
        let mut session = store.session().unwrap();
        // Lock is free again and the write never landed.
        let row = session.select_for_update(1).unwrap();
        assert_eq!(row.count, 0);
    }

    #[test]
    fn test_isolation_captured_at_session_open() {
        let store = store_with_row(1);
        let mut old = store.session().unwrap();
        store.set_isolation(IsolationLevel::Serializable);
        assert_eq!(store.isolation(), IsolationLevel::Serializable);

        // The pre-existing session still runs read committed: its stale
        // commit goes through silently.
        let mut other = store.session().unwrap();
        let _ = old.select(1).unwrap();
        let row = other.select(1).unwrap();
        other.update_count(1, row.count + 1).unwrap();
        other.commit().unwrap();
        old.update_count(1, 5).unwrap();
        assert!(old.commit().is_ok());
    }
}
