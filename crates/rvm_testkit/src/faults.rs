//! Fault injection for storage backends.
//!
//! [`FaultyOpener`] opens ordinary file backends and wraps them so that
//! writes or syncs start failing once a shared [`FaultPlan`] is armed. This
//! is how tests observe a commit that fails part-way.

use rvm_storage::{BackendOpener, FileOpener, StorageBackend, StorageError, StorageResult};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared switches controlling when wrapped backends fail.
#[derive(Debug, Default)]
pub struct FaultPlan {
    armed: AtomicBool,
    writes_left: AtomicUsize,
    fail_sync: AtomicBool,
    writes: AtomicUsize,
    syncs: AtomicUsize,
}

impl FaultPlan {
    /// Creates a disarmed plan.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lets `n` more writes succeed, then fails every write after that.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Makes every sync fail.
    pub fn fail_syncs(&self) {
        self.fail_sync.store(true, Ordering::SeqCst);
    }

    /// Clears all faults.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
        self.fail_sync.store(false, Ordering::SeqCst);
    }

    /// Returns the number of writes that reached the file.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of syncs that reached the file.
    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    fn allow_write(&self) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return true;
        }
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn injected(what: &str) -> StorageError {
        StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {what} failure"),
        ))
    }
}

/// A backend that fails according to a [`FaultPlan`].
pub struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    plan: Arc<FaultPlan>,
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if !self.plan.allow_write() {
            return Err(FaultPlan::injected("write"));
        }
        self.plan.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_at(offset, data)
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.plan.fail_sync.load(Ordering::SeqCst) {
            return Err(FaultPlan::injected("sync"));
        }
        self.inner.sync()?;
        self.plan.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens file backends wrapped in [`FaultyBackend`].
#[derive(Debug)]
pub struct FaultyOpener {
    plan: Arc<FaultPlan>,
}

impl FaultyOpener {
    /// Creates an opener driven by `plan`.
    pub fn new(plan: Arc<FaultPlan>) -> Arc<Self> {
        Arc::new(Self { plan })
    }
}

impl BackendOpener for FaultyOpener {
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StorageBackend>> {
        Ok(Box::new(FaultyBackend {
            inner: FileOpener.open(path)?,
            plan: Arc::clone(&self.plan),
        }))
    }

    fn remove(&self, path: &Path) -> StorageResult<bool> {
        FileOpener.remove(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disarmed_plan_allows_everything() {
        let dir = tempdir().unwrap();
        let plan = FaultPlan::new();
        let mut backend = FaultyOpener::new(Arc::clone(&plan))
            .open(&dir.path().join("seg"))
            .unwrap();

        backend.write_at(0, b"ok").unwrap();
        backend.sync().unwrap();
        assert_eq!(plan.writes(), 1);
        assert_eq!(plan.syncs(), 1);
    }

    #[test]
    fn armed_plan_fails_after_budget() {
        let dir = tempdir().unwrap();
        let plan = FaultPlan::new();
        let mut backend = FaultyOpener::new(Arc::clone(&plan))
            .open(&dir.path().join("seg"))
            .unwrap();

        plan.fail_writes_after(1);
        backend.write_at(0, b"first").unwrap();
        assert!(backend.write_at(0, b"second").is_err());
        assert_eq!(backend.read_at(0, 5).unwrap(), b"first");

        plan.fail_syncs();
        assert!(backend.sync().is_err());
        assert_eq!(plan.syncs(), 0);

        plan.disarm();
        backend.write_at(0, b"third").unwrap();
        backend.sync().unwrap();
        assert_eq!(plan.syncs(), 1);
    }
}
