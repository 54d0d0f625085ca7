//! Context configuration.

/// Configuration shared by every store opened through one [`crate::Rvm`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether `init` creates the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether commit fsyncs the backing file after every region write.
    ///
    /// Disabling this gives up durability and is only meant for throwaway
    /// stores in tests.
    pub sync_on_commit: bool,

    /// Whether `init` takes an exclusive advisory lock on the directory.
    pub lock_directory: bool,

    /// Whether `destroy` fsyncs the directory after deleting a backing file.
    pub sync_directory_on_destroy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            lock_directory: true,
            sync_directory_on_destroy: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync after every region write on commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether to lock store directories.
    #[must_use]
    pub const fn lock_directory(mut self, value: bool) -> Self {
        self.lock_directory = value;
        self
    }

    /// Sets whether to fsync the directory after destroying a segment.
    #[must_use]
    pub const fn sync_directory_on_destroy(mut self, value: bool) -> Self {
        self.sync_directory_on_destroy = value;
        self
    }
}
