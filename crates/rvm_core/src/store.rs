//! Store: the segment catalog of one backing directory.

use crate::config::Config;
use crate::dir::{validate_segment_name, StoreDir};
use crate::error::{CoreError, CoreResult};
use crate::segment::{Segment, SegmentStatus};
use crate::types::{SegmentHandle, StoreId, TransactionId};
use rvm_storage::BackendOpener;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The catalog of segments backed by one directory.
///
/// Segment records are owned by the name-keyed catalog. The handle-keyed
/// index only stores names, and only has entries for mapped segments. A
/// record survives unmap so its name can be mapped again.
///
/// Stores are created and driven through [`crate::Rvm`]; this type exposes
/// read-only inspection.
#[derive(Debug)]
pub struct Store {
    id: StoreId,
    dir: StoreDir,
    opener: Arc<dyn BackendOpener>,
    sync_directory_on_destroy: bool,
    segments: HashMap<String, Segment>,
    handles: HashMap<SegmentHandle, String>,
}

impl Store {
    pub(crate) fn new(
        id: StoreId,
        dir: StoreDir,
        opener: Arc<dyn BackendOpener>,
        config: &Config,
    ) -> Self {
        Self {
            id,
            dir,
            opener,
            sync_directory_on_destroy: config.sync_directory_on_destroy,
            segments: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    /// Returns the store handle.
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Returns the backing directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Looks up a segment record by name, mapped or not.
    #[must_use]
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Iterates over every segment record, sorted by name.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        let mut segments: Vec<_> = self.segments.values().collect();
        segments.sort_by(|a, b| a.name().cmp(b.name()));
        segments.into_iter()
    }

    /// Returns the number of currently mapped segments.
    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.handles.len()
    }

    /// Resolves a handle to its mapped segment.
    #[must_use]
    pub fn by_handle(&self, handle: SegmentHandle) -> Option<&Segment> {
        self.handles
            .get(&handle)
            .and_then(|name| self.segments.get(name))
    }

    pub(crate) fn by_handle_mut(&mut self, handle: SegmentHandle) -> Option<&mut Segment> {
        let name = self.handles.get(&handle)?;
        self.segments.get_mut(name)
    }

    /// Maps `name` into memory under `handle`.
    pub(crate) fn map(
        &mut self,
        name: &str,
        size: usize,
        handle: SegmentHandle,
    ) -> CoreResult<SegmentHandle> {
        let path = self.dir.segment_path(name)?;

        if let Some(existing) = self.segments.get(name) {
            if existing.status() != SegmentStatus::Unmapped {
                debug!(store = %self.id, segment = name, "refusing to map segment twice");
                return Err(CoreError::AlreadyMapped { name: name.into() });
            }
        }

        let is_new = !self.segments.contains_key(name);
        let backend = self.opener.open(&path)?;
        let segment = self
            .segments
            .entry(name.to_owned())
            .or_insert_with(|| Segment::new(name, path));
        if let Err(e) = segment.load(backend, size, handle) {
            if is_new {
                self.segments.remove(name);
            }
            return Err(e);
        }

        self.handles.insert(handle, name.to_owned());
        debug!(store = %self.id, segment = name, %handle, size, "mapped segment");
        Ok(handle)
    }

    /// Unmaps the segment behind `handle`.
    ///
    /// Unknown handles are ignored.
    pub(crate) fn unmap(&mut self, handle: SegmentHandle) -> CoreResult<()> {
        let Some(segment) = self.by_handle_mut(handle) else {
            return Ok(());
        };

        match segment.status() {
            SegmentStatus::Unmapped => return Ok(()),
            SegmentStatus::Acquired(holder) => {
                return Err(CoreError::SegmentAcquired {
                    name: segment.name().to_owned(),
                    holder,
                });
            }
            SegmentStatus::Mapped => {}
        }

        segment.unload();
        self.handles.remove(&handle);
        debug!(store = %self.id, %handle, "unmapped segment");
        Ok(())
    }

    /// Deletes the named segment's record and backing file.
    ///
    /// Silently does nothing while the segment is mapped or acquired.
    pub(crate) fn destroy(&mut self, name: &str) -> CoreResult<()> {
        validate_segment_name(name)?;

        if let Some(segment) = self.segments.get(name) {
            if segment.status() != SegmentStatus::Unmapped {
                debug!(
                    store = %self.id,
                    segment = name,
                    status = %segment.status(),
                    "destroy ignored"
                );
                return Ok(());
            }
        }

        self.segments.remove(name);
        let path = self.dir.segment_path(name)?;
        if self.opener.remove(&path)? {
            if self.sync_directory_on_destroy {
                self.dir.sync_directory()?;
            }
            info!(store = %self.id, segment = name, "destroyed segment");
        }
        Ok(())
    }

    /// Checks that every handle resolves to a segment in `Mapped` status.
    pub(crate) fn check_acquirable(&self, handles: &[SegmentHandle]) -> CoreResult<()> {
        for &handle in handles {
            let segment = self
                .by_handle(handle)
                .ok_or(CoreError::SegmentNotMapped { handle })?;
            match segment.status() {
                SegmentStatus::Mapped => {}
                SegmentStatus::Acquired(holder) => {
                    return Err(CoreError::SegmentBusy { handle, holder });
                }
                SegmentStatus::Unmapped => return Err(CoreError::SegmentNotMapped { handle }),
            }
        }
        Ok(())
    }

    /// Marks every handle as acquired by `txn`.
    ///
    /// Callers must run [`Store::check_acquirable`] first; this never fails
    /// part-way.
    pub(crate) fn acquire(
        &mut self,
        handles: &[SegmentHandle],
        txn: TransactionId,
    ) -> BTreeSet<SegmentHandle> {
        let mut acquired = BTreeSet::new();
        for &handle in handles {
            if !acquired.insert(handle) {
                continue;
            }
            if let Some(segment) = self.by_handle_mut(handle) {
                segment.acquire(txn);
            }
        }
        acquired
    }

    /// Returns acquired segments to `Mapped`.
    pub(crate) fn release<'a>(&mut self, handles: impl IntoIterator<Item = &'a SegmentHandle>) {
        for &handle in handles {
            if let Some(segment) = self.by_handle_mut(handle) {
                segment.release();
            }
        }
    }

    /// Unmaps every mapped segment. Used when the store is closed.
    pub(crate) fn unmap_all(&mut self) {
        for segment in self.segments.values_mut() {
            segment.release();
            segment.unload();
        }
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvm_storage::FileOpener;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, Store) {
        let temp = tempdir().unwrap();
        let dir = StoreDir::open(temp.path(), true, false).unwrap();
        let store = Store::new(
            StoreId::new(1),
            dir,
            Arc::new(FileOpener),
            &Config::default(),
        );
        (temp, store)
    }

    #[test]
    fn map_creates_backing_file() {
        let (temp, mut store) = store();
        let handle = store.map("accounts", 64, SegmentHandle::new(1)).unwrap();

        let path = temp.path().join("accounts");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 64);
        let segment = store.by_handle(handle).unwrap();
        assert_eq!(segment.status(), SegmentStatus::Mapped);
        assert_eq!(segment.buffer().unwrap(), &[0u8; 64][..]);
        assert_eq!(store.mapped_count(), 1);
    }

    #[test]
    fn map_twice_is_refused() {
        let (_temp, mut store) = store();
        let handle = store.map("accounts", 8, SegmentHandle::new(1)).unwrap();
        store.by_handle_mut(handle).unwrap().buffer_mut().unwrap()[0] = 7;

        let result = store.map("accounts", 8, SegmentHandle::new(2));
        assert!(matches!(result, Err(CoreError::AlreadyMapped { .. })));
        assert_eq!(store.by_handle(handle).unwrap().buffer().unwrap()[0], 7);
        assert!(store.by_handle(SegmentHandle::new(2)).is_none());
    }

    #[test]
    fn map_rejects_bad_name() {
        let (_temp, mut store) = store();
        let result = store.map("../outside", 8, SegmentHandle::new(1));
        assert!(matches!(result, Err(CoreError::InvalidSegmentName { .. })));
        assert!(store.segment("../outside").is_none());
    }

    #[test]
    fn unmap_keeps_name_record() {
        let (_temp, mut store) = store();
        let handle = store.map("accounts", 8, SegmentHandle::new(1)).unwrap();
        store.unmap(handle).unwrap();

        assert!(store.by_handle(handle).is_none());
        assert_eq!(
            store.segment("accounts").unwrap().status(),
            SegmentStatus::Unmapped
        );

        // Unknown and stale handles are ignored.
        store.unmap(handle).unwrap();
        store.unmap(SegmentHandle::new(99)).unwrap();

        let again = store.map("accounts", 8, SegmentHandle::new(2)).unwrap();
        assert_eq!(store.by_handle(again).unwrap().name(), "accounts");
    }

    #[test]
    fn unmap_acquired_is_error() {
        let (_temp, mut store) = store();
        let handle = store.map("accounts", 8, SegmentHandle::new(1)).unwrap();
        store.acquire(&[handle], TransactionId::new(1));

        let result = store.unmap(handle);
        assert!(matches!(result, Err(CoreError::SegmentAcquired { .. })));
        assert!(store.by_handle(handle).unwrap().buffer().is_some());
    }

    #[test]
    fn destroy_ignores_mapped_segment() {
        let (temp, mut store) = store();
        let handle = store.map("accounts", 8, SegmentHandle::new(1)).unwrap();

        store.destroy("accounts").unwrap();
        assert!(temp.path().join("accounts").exists());
        assert!(store.by_handle(handle).is_some());

        store.unmap(handle).unwrap();
        store.destroy("accounts").unwrap();
        assert!(!temp.path().join("accounts").exists());
        assert!(store.segment("accounts").is_none());
    }

    #[test]
    fn destroy_removes_file_without_record() {
        let (temp, mut store) = store();
        std::fs::write(temp.path().join("orphan"), b"left over").unwrap();

        store.destroy("orphan").unwrap();
        assert!(!temp.path().join("orphan").exists());

        // Nothing to delete is fine too.
        store.destroy("orphan").unwrap();
    }

    #[test]
    fn check_acquirable_is_all_or_nothing() {
        let (_temp, mut store) = store();
        let a = store.map("a", 8, SegmentHandle::new(1)).unwrap();
        let b = store.map("b", 8, SegmentHandle::new(2)).unwrap();
        store.acquire(&[b], TransactionId::new(1));

        let result = store.check_acquirable(&[a, b]);
        assert!(matches!(result, Err(CoreError::SegmentBusy { .. })));
        assert_eq!(store.by_handle(a).unwrap().status(), SegmentStatus::Mapped);

        let result = store.check_acquirable(&[a, SegmentHandle::new(42)]);
        assert!(matches!(result, Err(CoreError::SegmentNotMapped { .. })));
    }

    #[test]
    fn acquire_collapses_duplicates() {
        let (_temp, mut store) = store();
        let a = store.map("a", 8, SegmentHandle::new(1)).unwrap();

        let held = store.acquire(&[a, a], TransactionId::new(3));
        assert_eq!(held.len(), 1);
        assert_eq!(
            store.by_handle(a).unwrap().status(),
            SegmentStatus::Acquired(TransactionId::new(3))
        );

        store.release(&held);
        assert_eq!(store.by_handle(a).unwrap().status(), SegmentStatus::Mapped);
    }

    #[test]
    fn segments_are_sorted() {
        let (_temp, mut store) = store();
        store.map("b", 1, SegmentHandle::new(1)).unwrap();
        store.map("a", 1, SegmentHandle::new(2)).unwrap();

        let names: Vec<_> = store.segments().map(Segment::name).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
