//! Backend construction for segment files.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use crate::file::FileBackend;
use std::fmt;
use std::path::Path;

/// Creates the storage backend behind a segment's backing file.
///
/// A store calls [`BackendOpener::open`] every time a segment is mapped and
/// [`BackendOpener::remove`] when a segment is destroyed. The default
/// implementation is [`FileOpener`]; tests substitute openers that wrap or
/// replace the file backend.
pub trait BackendOpener: Send + Sync + fmt::Debug {
    /// Opens (creating if necessary) the backend stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or created.
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StorageBackend>>;

    /// Removes the backend stored at `path`.
    ///
    /// Returns `Ok(false)` if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails for any reason other than the
    /// backend not existing.
    fn remove(&self, path: &Path) -> StorageResult<bool>;
}

/// Opens [`FileBackend`]s on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOpener;

impl BackendOpener for FileOpener {
    fn open(&self, path: &Path) -> StorageResult<Box<dyn StorageBackend>> {
        Ok(Box::new(FileBackend::open(path)?))
    }

    fn remove(&self, path: &Path) -> StorageResult<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
