//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend holding the durable bytes of one segment.
///
/// Storage backends are **opaque byte stores**. They provide positional
/// reads and writes plus an explicit durability barrier. RVM owns all
/// interpretation of the bytes.
///
/// # Invariants
///
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `write_at` past the current end grows the store; any gap reads as zero
/// - `sync` ensures every completed `write_at` survives process termination
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`, overwriting whatever was there.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Grows the storage to at least `len` bytes.
    ///
    /// Only the final byte is written (a zero sentinel at `len - 1`); file
    /// backends leave the rest as a hole. Does nothing when the storage is
    /// already `len` bytes or larger.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn extend_to(&mut self, len: u64) -> StorageResult<()> {
        if len > self.size()? {
            self.write_at(len - 1, &[0])?;
        }
        Ok(())
    }

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Pushes buffered writes to the OS without a durability guarantee.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// After this returns successfully, every previous `write_at` is
    /// guaranteed to survive process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;
}
