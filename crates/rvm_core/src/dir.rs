//! Store directory management.
//!
//! A store directory holds one regular file per segment:
//!
//! ```text
//! <store_dir>/
//! ├─ .rvm.lock         # Advisory lock for single ownership
//! ├─ accounts          # Backing file of segment "accounts"
//! └─ ledger            # Backing file of segment "ledger"
//! ```
//!
//! The lock file only refuses a second owner. It does not coordinate
//! concurrent writers.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Name of the advisory lock file. Reserved: no segment may use it.
pub const LOCK_FILE: &str = ".rvm.lock";

/// Checks that `name` can be used verbatim as a backing file name.
///
/// # Errors
///
/// Returns `InvalidSegmentName` for empty names, `.`/`..`, names containing
/// a path separator or NUL, and the reserved lock file name.
pub fn validate_segment_name(name: &str) -> CoreResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name refers to a directory"
    } else if name.contains(['/', '\\', '\0']) {
        "name contains a path separator or NUL"
    } else if name == LOCK_FILE {
        "name is reserved"
    } else {
        return Ok(());
    };
    Err(CoreError::invalid_segment_name(name, reason))
}

/// An opened store directory, optionally holding its advisory lock.
#[derive(Debug)]
pub struct StoreDir {
    /// Canonical directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive ownership).
    _lock_file: Option<File>,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the store directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    /// * `lock` - If true, takes an exclusive advisory lock on the directory
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another owner holds the lock (returns `DirectoryLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool, lock: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("store directory does not exist: {}", path.display()),
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        let path = Self::canonical(path)?;

        let lock_file = if lock {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path.join(LOCK_FILE))?;
            if file.try_lock_exclusive().is_err() {
                return Err(CoreError::DirectoryLocked { path });
            }
            Some(file)
        } else {
            None
        };

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Resolves `path` to the key used to detect duplicate stores.
    pub fn canonical(path: &Path) -> CoreResult<PathBuf> {
        Ok(fs::canonicalize(path)?)
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the backing file path of the named segment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegmentName` if the name is unusable.
    pub fn segment_path(&self, name: &str) -> CoreResult<PathBuf> {
        validate_segment_name(name)?;
        Ok(self.path.join(name))
    }

    /// Syncs the directory so created or deleted entries are durable.
    #[cfg(unix)]
    pub fn sync_directory(&self) -> CoreResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    /// Directory fsync is not supported on this platform.
    #[cfg(not(unix))]
    pub fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}
