//! Segment record and status.

use crate::error::{CoreError, CoreResult};
use crate::types::{SegmentHandle, TransactionId};
use rvm_storage::StorageBackend;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle status of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// No buffer or backend is held.
    Unmapped,
    /// Loaded into memory and free to be acquired.
    Mapped,
    /// Exclusively held by a live transaction.
    Acquired(TransactionId),
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped => f.write_str("unmapped"),
            Self::Mapped => f.write_str("mapped"),
            Self::Acquired(txn) => write!(f, "acquired by {txn}"),
        }
    }
}

/// State that only exists while a segment is mapped.
struct Mapping {
    handle: SegmentHandle,
    backend: Box<dyn StorageBackend>,
    buffer: Vec<u8>,
}

/// A named, file-backed memory region.
///
/// # Invariants
///
/// - The buffer and backend exist if and only if the status is not
///   [`SegmentStatus::Unmapped`].
/// - The buffer is exactly `mapped_size` bytes long.
pub struct Segment {
    name: String,
    path: PathBuf,
    status: SegmentStatus,
    mapped_size: usize,
    /// Backing file length observed at map time, before any extension.
    file_size: u64,
    mapping: Option<Mapping>,
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("status", &self.status)
            .field("mapped_size", &self.mapped_size)
            .field("file_size", &self.file_size)
            .field("handle", &self.handle())
            .finish()
    }
}

impl Segment {
    /// Creates an unmapped segment record.
    pub(crate) fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            status: SegmentStatus::Unmapped,
            mapped_size: 0,
            file_size: 0,
            mapping: None,
        }
    }

    /// Loads `mapped_size` bytes from `backend` into a fresh buffer.
    ///
    /// If the backend is shorter than `mapped_size` it is first extended by
    /// writing a single zero byte at the new end. On error the segment stays
    /// unmapped and the backend is dropped.
    pub(crate) fn load(
        &mut self,
        mut backend: Box<dyn StorageBackend>,
        mapped_size: usize,
        handle: SegmentHandle,
    ) -> CoreResult<()> {
        debug_assert_eq!(self.status, SegmentStatus::Unmapped);

        let file_size = backend.size()?;
        backend.extend_to(mapped_size as u64)?;
        let buffer = backend.read_at(0, mapped_size)?;

        self.file_size = file_size;
        self.mapped_size = mapped_size;
        self.mapping = Some(Mapping {
            handle,
            backend,
            buffer,
        });
        self.status = SegmentStatus::Mapped;
        Ok(())
    }

    /// Releases the buffer and closes the backend.
    ///
    /// Returns the handle the segment was mapped under.
    pub(crate) fn unload(&mut self) -> Option<SegmentHandle> {
        self.status = SegmentStatus::Unmapped;
        self.mapping.take().map(|m| m.handle)
    }

    /// Returns the segment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    /// Returns the size requested by the most recent map.
    #[must_use]
    pub fn mapped_size(&self) -> usize {
        self.mapped_size
    }

    /// Returns the backing file length seen by the most recent map, before
    /// it was extended.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Returns the handle of the current mapping, if mapped.
    #[must_use]
    pub fn handle(&self) -> Option<SegmentHandle> {
        self.mapping.as_ref().map(|m| m.handle)
    }

    /// Returns the in-memory buffer, if mapped.
    #[must_use]
    pub fn buffer(&self) -> Option<&[u8]> {
        self.mapping.as_ref().map(|m| m.buffer.as_slice())
    }

    /// Returns the in-memory buffer mutably, if mapped.
    pub fn buffer_mut(&mut self) -> Option<&mut [u8]> {
        self.mapping.as_mut().map(|m| m.buffer.as_mut_slice())
    }

    pub(crate) fn acquire(&mut self, txn: TransactionId) {
        debug_assert_eq!(self.status, SegmentStatus::Mapped);
        self.status = SegmentStatus::Acquired(txn);
    }

    pub(crate) fn release(&mut self) {
        if let SegmentStatus::Acquired(_) = self.status {
            self.status = SegmentStatus::Mapped;
        }
    }

    /// Checks that `[offset, offset + len)` lies inside the mapped size.
    pub(crate) fn check_range(&self, offset: usize, len: usize) -> CoreResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.mapped_size => Ok(()),
            _ => Err(CoreError::RegionOutOfBounds {
                offset,
                len,
                mapped_size: self.mapped_size,
            }),
        }
    }

    /// Copies the current buffer contents of a range.
    pub(crate) fn snapshot(&self, offset: usize, len: usize) -> CoreResult<Vec<u8>> {
        self.check_range(offset, len)?;
        let mapping = self.mapped()?;
        Ok(mapping.buffer[offset..offset + len].to_vec())
    }

    /// Copies `before` back into the buffer at `offset`.
    pub(crate) fn restore(&mut self, offset: usize, before: &[u8]) -> CoreResult<()> {
        self.check_range(offset, before.len())?;
        let mapping = self.mapped_mut()?;
        mapping.buffer[offset..offset + before.len()].copy_from_slice(before);
        Ok(())
    }

    /// Writes the current buffer contents of a range to the backend.
    ///
    /// With `sync` set the backend is fsynced before returning.
    pub(crate) fn persist(&mut self, offset: usize, len: usize, sync: bool) -> CoreResult<()> {
        self.check_range(offset, len)?;
        let mapping = self.mapped_mut()?;
        mapping
            .backend
            .write_at(offset as u64, &mapping.buffer[offset..offset + len])?;
        if sync {
            mapping.backend.sync()?;
        } else {
            mapping.backend.flush()?;
        }
        Ok(())
    }

    fn mapped(&self) -> CoreResult<&Mapping> {
        self.mapping.as_ref().ok_or(CoreError::SegmentUnmapped {
            name: self.name.clone(),
        })
    }

    fn mapped_mut(&mut self) -> CoreResult<&mut Mapping> {
        let name = &self.name;
        self.mapping.as_mut().ok_or_else(|| CoreError::SegmentUnmapped {
            name: name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvm_storage::InMemoryBackend;

    fn loaded(data: &[u8], size: usize) -> Segment {
        let mut seg = Segment::new("accounts", PathBuf::from("db/accounts"));
        seg.load(
            Box::new(InMemoryBackend::with_data(data.to_vec())),
            size,
            SegmentHandle::new(1),
        )
        .unwrap();
        seg
    }

    #[test]
    fn new_segment_is_unmapped() {
        let seg = Segment::new("accounts", PathBuf::from("db/accounts"));
        assert_eq!(seg.status(), SegmentStatus::Unmapped);
        assert!(seg.buffer().is_none());
        assert!(seg.handle().is_none());
    }

    #[test]
    fn load_extends_short_backend() {
        let seg = loaded(b"abc", 8);

        assert_eq!(seg.status(), SegmentStatus::Mapped);
        assert_eq!(seg.file_size(), 3);
        assert_eq!(seg.mapped_size(), 8);
        assert_eq!(seg.buffer().unwrap(), b"abc\0\0\0\0\0");
        assert_eq!(seg.handle(), Some(SegmentHandle::new(1)));
    }

    #[test]
    fn load_reads_prefix_of_long_backend() {
        let seg = loaded(b"0123456789", 4);
        assert_eq!(seg.buffer().unwrap(), b"0123");
        assert_eq!(seg.file_size(), 10);
    }

    #[test]
    fn unload_drops_buffer() {
        let mut seg = loaded(b"abc", 3);
        assert_eq!(seg.unload(), Some(SegmentHandle::new(1)));
        assert_eq!(seg.status(), SegmentStatus::Unmapped);
        assert!(seg.buffer().is_none());
        assert_eq!(seg.unload(), None);
    }

    #[test]
    fn acquire_and_release() {
        let mut seg = loaded(b"", 4);
        seg.acquire(TransactionId::new(9));
        assert_eq!(seg.status(), SegmentStatus::Acquired(TransactionId::new(9)));
        seg.release();
        assert_eq!(seg.status(), SegmentStatus::Mapped);
    }

    #[test]
    fn snapshot_and_restore() {
        let mut seg = loaded(b"hello world", 11);
        let before = seg.snapshot(0, 5).unwrap();
        seg.buffer_mut().unwrap()[..5].copy_from_slice(b"HOWDY");
        assert_eq!(seg.buffer().unwrap(), b"HOWDY world");

        seg.restore(0, &before).unwrap();
        assert_eq!(seg.buffer().unwrap(), b"hello world");
    }

    #[test]
    fn range_checks() {
        let seg = loaded(b"", 16);
        assert!(seg.check_range(0, 16).is_ok());
        assert!(seg.check_range(16, 0).is_ok());
        assert!(matches!(
            seg.check_range(10, 7),
            Err(CoreError::RegionOutOfBounds { mapped_size: 16, .. })
        ));
        assert!(seg.check_range(usize::MAX, 2).is_err());
        assert!(seg.snapshot(8, 9).is_err());
    }

    #[test]
    fn unmapped_segment_rejects_io() {
        let mut seg = loaded(b"abc", 3);
        seg.unload();
        assert!(matches!(
            seg.restore(0, b"x"),
            Err(CoreError::SegmentUnmapped { .. })
        ));
        assert!(seg.persist(0, 0, true).is_err());
        assert!(seg.snapshot(0, 1).is_err());
    }
}
