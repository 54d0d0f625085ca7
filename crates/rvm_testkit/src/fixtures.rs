//! Test fixtures and store helpers.
//!
//! Provides a context with one open store over a temporary directory,
//! plus helpers to inspect backing files without going through RVM.

use rvm_core::{Config, Rvm, SegmentHandle, StoreId};
use rvm_storage::BackendOpener;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A context with one store over a temporary directory.
///
/// The directory is deleted when the fixture is dropped.
pub struct TestStore {
    /// The context.
    pub rvm: Rvm,
    /// The open store.
    pub store: StoreId,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a fixture with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::build(Rvm::with_config(config))
    }

    /// Creates a fixture whose segments are opened through `opener`.
    pub fn with_opener(opener: Arc<dyn BackendOpener>) -> Self {
        Self::with_config_and_opener(Config::default(), opener)
    }

    /// Creates a fixture with both a configuration and a backend opener.
    pub fn with_config_and_opener(config: Config, opener: Arc<dyn BackendOpener>) -> Self {
        Self::build(Rvm::with_opener(config, opener))
    }

    fn build(mut rvm: Rvm) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = rvm
            .init(temp_dir.path().join("db"))
            .expect("Failed to init store");
        Self {
            rvm,
            store,
            temp_dir,
        }
    }

    /// Returns the store directory.
    pub fn dir(&self) -> PathBuf {
        self.temp_dir.path().join("db")
    }

    /// Returns the backing file path of a segment.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir().join(name)
    }

    /// Reads a segment's backing file directly from disk.
    pub fn file_bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.file_path(name)).expect("Failed to read backing file")
    }

    /// Writes a backing file directly, bypassing RVM.
    pub fn seed_file(&self, name: &str, data: &[u8]) {
        std::fs::write(self.file_path(name), data).expect("Failed to seed backing file");
    }

    /// Maps a segment, panicking on failure.
    pub fn map(&mut self, name: &str, size: usize) -> SegmentHandle {
        self.rvm
            .map(self.store, name, size)
            .expect("Failed to map segment")
    }

    /// Unmaps and maps a segment again, returning the new handle.
    pub fn remap(&mut self, handle: SegmentHandle, name: &str, size: usize) -> SegmentHandle {
        self.rvm
            .unmap(self.store, handle)
            .expect("Failed to unmap segment");
        self.map(name, size)
    }

    /// Returns a copy of a mapped segment's buffer.
    pub fn read(&self, handle: SegmentHandle) -> Vec<u8> {
        self.rvm
            .segment(self.store, handle)
            .expect("Segment not mapped")
            .to_vec()
    }

    /// Writes into a mapped segment's buffer.
    pub fn write(&mut self, handle: SegmentHandle, offset: usize, data: &[u8]) {
        let buffer = self
            .rvm
            .segment_mut(self.store, handle)
            .expect("Segment not mapped");
        buffer[offset..offset + data.len()].copy_from_slice(data);
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test against a fresh temporary store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut TestStore) -> R,
{
    let mut store = TestStore::new();
    f(&mut store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_creates_store_directory() {
        let t = TestStore::new();
        assert!(t.dir().is_dir());
        assert_eq!(t.rvm.store_count(), 1);
    }

    #[test]
    fn seed_and_map() {
        let mut t = TestStore::new();
        t.seed_file("seeded", b"hello");

        let seg = t.map("seeded", 5);
        assert_eq!(t.read(seg), b"hello");
    }

    #[test]
    fn directory_removed_on_drop() {
        let dir = with_temp_store(|t| {
            t.map("a", 1);
            t.dir()
        });
        assert!(!dir.exists());
    }
}
