//! Counter persisted to a file with atomic replace on write.
//!
//! Each increment reads the persisted value while holding an exclusive
//! in-process lock, computes the new value, writes it to a temporary file,
//! flushes it to disk and atomically renames it over the target. A reader -
//! or a process restarted after a crash - never observes a partially written
//! value: the rename either happened (new value) or did not (prior value
//! intact, the temporary file is ignored and overwritten by the next write).
//!
//! The lock is in-process only, so this backend is single-writer-process:
//! two processes incrementing the same file will lose updates to each other.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{CounterError, Result};
use crate::stores::CounterStore;

/// File-backed counter, single-writer-process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store persisting to `path`. The file itself is created by
    /// [`initialize`](CounterStore::initialize) or the first increment.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Creates the file holding `0` if it does not exist yet.
    /// Caller must hold the lock.
    fn ensure_file_exists(&self) -> Result<()> {
        if !self.path.exists() {
            self.write_value(0)?;
        }
        Ok(())
    }

    /// Caller must hold the lock.
    fn read_value(&self) -> Result<u64> {
        let raw = fs::read_to_string(&self.path)?;
        raw.trim()
            .parse()
            .map_err(|_| CounterError::Corrupt(format!("{}: {raw:?}", self.path.display())))
    }

    /// Writes `value` via temp file, fsync and atomic rename.
    /// Caller must hold the lock.
    fn write_value(&self, value: u64) -> Result<()> {
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(value.to_string().as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl CounterStore for FileStore {
    /// Creates the counter file holding `0` if absent; an existing value is
    /// left untouched.
    fn initialize(&self) -> Result<()> {
        let _guard = self.guard();
        self.ensure_file_exists()
    }

    fn increment(&self) -> Result<u64> {
        let _guard = self.guard();
        self.ensure_file_exists()?;
        let count = self.read_value()? + 1;
        self.write_value(count)?;
        Ok(count)
    }

    fn get_count(&self) -> Result<u64> {
        let _guard = self.guard();
        self.ensure_file_exists()?;
        self.read_value()
    }

    /// Nothing held open between operations.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("counter.txt"))
    }

    #[test]
    fn test_initialize_creates_zero_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.initialize().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "0");
        assert_eq!(store.get_count().unwrap(), 0);
    }

    #[test]
    fn test_initialize_preserves_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.increment().unwrap();
        store.increment().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.get_count().unwrap(), 2);
    }

    #[test]
    fn test_increment_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        {
            let store = FileStore::new(&path);
            assert_eq!(store.increment().unwrap(), 1);
            assert_eq!(store.increment().unwrap(), 2);
        }
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get_count().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let mut handles = vec![];
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    store.increment().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get_count().unwrap(), 200);
    }

    #[test]
    fn test_interrupted_write_leaves_prior_value_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.increment().unwrap();
        store.increment().unwrap();

        // A crash after the temp write but before the rename leaves a stray
        // temp file; the target must still hold the last complete value.
        fs::write(store.temp_path(), "partial garb").unwrap();
        assert_eq!(store.get_count().unwrap(), 2);

        // The next increment simply overwrites the stray temp file.
        assert_eq!(store.increment().unwrap(), 3);
        assert_eq!(store.get_count().unwrap(), 3);
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not a number").unwrap();
        assert!(matches!(
            store.get_count(),
            Err(CounterError::Corrupt(_))
        ));
    }
}
