//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::types::{SegmentHandle, StoreId, TransactionId};
use std::collections::BTreeSet;

/// One declared modification: a byte range and its before-image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// The segment being modified.
    pub handle: SegmentHandle,
    /// Start of the range.
    pub offset: usize,
    /// Buffer contents of the range when the modification was declared.
    pub before: Vec<u8>,
}

impl Region {
    /// Length of the range in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before.len()
    }

    /// Returns `true` for a zero-length declaration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }
}

/// A live transaction.
///
/// Regions are kept in declaration order. Both commit and abort walk them in
/// that order.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    store: StoreId,
    segments: BTreeSet<SegmentHandle>,
    regions: Vec<Region>,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        store: StoreId,
        segments: BTreeSet<SegmentHandle>,
    ) -> Self {
        Self {
            id,
            store,
            segments,
            regions: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the store whose segments this transaction holds.
    #[must_use]
    pub fn store(&self) -> StoreId {
        self.store
    }

    /// Returns the acquired segments.
    #[must_use]
    pub fn segments(&self) -> &BTreeSet<SegmentHandle> {
        &self.segments
    }

    /// Returns `true` if the transaction acquired `handle`.
    #[must_use]
    pub fn holds(&self, handle: SegmentHandle) -> bool {
        self.segments.contains(&handle)
    }

    /// Returns the declared regions in declaration order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Records the before-image of `[offset, offset + len)` in `handle`.
    ///
    /// On error nothing is recorded.
    pub(crate) fn about_to_modify(
        &mut self,
        store: &Store,
        handle: SegmentHandle,
        offset: usize,
        len: usize,
    ) -> CoreResult<()> {
        if !self.holds(handle) {
            return Err(CoreError::NotInTransaction {
                txn: self.id,
                handle,
            });
        }
        let segment = store
            .by_handle(handle)
            .ok_or(CoreError::SegmentNotMapped { handle })?;
        let before = segment.snapshot(offset, len)?;

        self.regions.push(Region {
            handle,
            offset,
            before,
        });
        Ok(())
    }

    /// Writes every declared range's current contents to its backing file.
    ///
    /// Stops at the first failure; ranges already written stay written.
    pub(crate) fn commit(&self, store: &mut Store, sync: bool) -> CoreResult<()> {
        for region in &self.regions {
            let segment = store
                .by_handle_mut(region.handle)
                .ok_or(CoreError::SegmentNotMapped {
                    handle: region.handle,
                })?;
            segment.persist(region.offset, region.len(), sync)?;
        }
        Ok(())
    }

    /// Copies every before-image back into its buffer, in declaration order.
    ///
    /// When two regions overlap, the earlier snapshot is restored first and
    /// the later one wins for the shared bytes.
    pub(crate) fn abort(&self, store: &mut Store) -> CoreResult<()> {
        for region in &self.regions {
            let segment = store
                .by_handle_mut(region.handle)
                .ok_or(CoreError::SegmentNotMapped {
                    handle: region.handle,
                })?;
            segment.restore(region.offset, &region.before)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dir::StoreDir;
    use rvm_storage::FileOpener;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    const TXN: TransactionId = TransactionId::new(1);

    fn setup(size: usize) -> (TempDir, Store, SegmentHandle, Transaction) {
        let temp = tempdir().unwrap();
        let dir = StoreDir::open(temp.path(), true, false).unwrap();
        let mut store = Store::new(
            StoreId::new(1),
            dir,
            Arc::new(FileOpener),
            &Config::default(),
        );
        let handle = store.map("seg", size, SegmentHandle::new(1)).unwrap();
        let held = store.acquire(&[handle], TXN);
        let txn = Transaction::new(TXN, store.id(), held);
        (temp, store, handle, txn)
    }

    fn write(store: &mut Store, handle: SegmentHandle, offset: usize, data: &[u8]) {
        let buffer = store.by_handle_mut(handle).unwrap().buffer_mut().unwrap();
        buffer[offset..offset + data.len()].copy_from_slice(data);
    }

    fn buffer(store: &Store, handle: SegmentHandle) -> Vec<u8> {
        store.by_handle(handle).unwrap().buffer().unwrap().to_vec()
    }

    #[test]
    fn about_to_modify_records_before_image() {
        let (_temp, mut store, handle, mut txn) = setup(8);
        write(&mut store, handle, 0, b"abcdefgh");

        txn.about_to_modify(&store, handle, 2, 3).unwrap();

        assert_eq!(txn.regions().len(), 1);
        assert_eq!(txn.regions()[0].offset, 2);
        assert_eq!(txn.regions()[0].before, b"cde");
    }

    #[test]
    fn about_to_modify_rejects_foreign_handle() {
        let (_temp, mut store, _handle, mut txn) = setup(8);
        let other = store.map("other", 8, SegmentHandle::new(2)).unwrap();

        let result = txn.about_to_modify(&store, other, 0, 1);
        assert!(matches!(result, Err(CoreError::NotInTransaction { .. })));
        assert!(txn.regions().is_empty());
    }

    #[test]
    fn about_to_modify_rejects_out_of_bounds() {
        let (_temp, store, handle, mut txn) = setup(8);

        let result = txn.about_to_modify(&store, handle, 4, 5);
        assert!(matches!(result, Err(CoreError::RegionOutOfBounds { .. })));
        assert!(txn.regions().is_empty());
        assert_eq!(buffer(&store, handle), [0u8; 8]);
    }

    #[test]
    fn commit_writes_current_contents() {
        let (temp, mut store, handle, mut txn) = setup(8);
        txn.about_to_modify(&store, handle, 4, 4).unwrap();
        write(&mut store, handle, 4, b"WXYZ");

        txn.commit(&mut store, true).unwrap();

        let on_disk = std::fs::read(temp.path().join("seg")).unwrap();
        assert_eq!(on_disk, b"\0\0\0\0WXYZ");
    }

    #[test]
    fn commit_skips_undeclared_writes() {
        let (temp, mut store, handle, mut txn) = setup(8);
        txn.about_to_modify(&store, handle, 0, 2).unwrap();
        write(&mut store, handle, 0, b"abcdefgh");

        txn.commit(&mut store, true).unwrap();

        let on_disk = std::fs::read(temp.path().join("seg")).unwrap();
        assert_eq!(on_disk, b"ab\0\0\0\0\0\0");
    }

    #[test]
    fn abort_restores_buffer() {
        let (temp, mut store, handle, mut txn) = setup(8);
        write(&mut store, handle, 0, b"original");
        txn.about_to_modify(&store, handle, 0, 8).unwrap();
        write(&mut store, handle, 0, b"modified");

        txn.abort(&mut store).unwrap();

        assert_eq!(buffer(&store, handle), b"original");
        let on_disk = std::fs::read(temp.path().join("seg")).unwrap();
        assert_eq!(on_disk, [0u8; 8]);
    }

    #[test]
    fn abort_restores_overlaps_in_declaration_order() {
        let (_temp, mut store, handle, mut txn) = setup(4);
        write(&mut store, handle, 0, b"AAAA");

        txn.about_to_modify(&store, handle, 0, 4).unwrap();
        write(&mut store, handle, 0, b"BBBB");
        txn.about_to_modify(&store, handle, 1, 2).unwrap();
        write(&mut store, handle, 1, b"CC");

        txn.abort(&mut store).unwrap();

        // The second snapshot ("BB") is applied last and wins.
        assert_eq!(buffer(&store, handle), b"ABBA");
    }

    #[test]
    fn zero_length_region() {
        let (_temp, mut store, handle, mut txn) = setup(4);
        txn.about_to_modify(&store, handle, 4, 0).unwrap();
        assert!(txn.regions()[0].is_empty());

        txn.commit(&mut store, true).unwrap();
        txn.abort(&mut store).unwrap();
    }
}
