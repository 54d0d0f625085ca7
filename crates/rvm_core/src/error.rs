//! Error types for RVM core.
//!
//! Errors fall into two tiers. Fatal errors are I/O failures and caller
//! contract violations; recoverable errors are refusals that leave every
//! store and transaction exactly as they were. [`CoreError::is_fatal`]
//! tells them apart. Neither tier terminates the process.

use crate::types::{SegmentHandle, StoreId, TransactionId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in RVM core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] rvm_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store handle is not registered in this context.
    #[error("unknown store: {store}")]
    UnknownStore {
        /// The handle that failed to resolve.
        store: StoreId,
    },

    /// The transaction handle is not live in this context.
    #[error("unknown transaction: {txn}")]
    UnknownTransaction {
        /// The handle that failed to resolve.
        txn: TransactionId,
    },

    /// The directory already backs a live store in this context.
    #[error("directory already backs a live store: {}", path.display())]
    DirectoryInUse {
        /// The (canonical) directory path.
        path: PathBuf,
    },

    /// Another owner holds the directory's advisory lock.
    #[error("directory locked by another owner: {}", path.display())]
    DirectoryLocked {
        /// The directory path.
        path: PathBuf,
    },

    /// The segment is already mapped (or held by a transaction).
    #[error("segment already mapped: {name}")]
    AlreadyMapped {
        /// Name of the segment.
        name: String,
    },

    /// The handle does not resolve to a mapped segment.
    #[error("no mapped segment for handle {handle}")]
    SegmentNotMapped {
        /// The handle that failed to resolve.
        handle: SegmentHandle,
    },

    /// The segment is held by another live transaction.
    #[error("segment {handle} is held by {holder}")]
    SegmentBusy {
        /// The contended segment.
        handle: SegmentHandle,
        /// The transaction currently holding it.
        holder: TransactionId,
    },

    /// Attempted to unmap a segment held by a live transaction.
    #[error("cannot unmap segment {name}: held by {holder}")]
    SegmentAcquired {
        /// Name of the segment.
        name: String,
        /// The transaction currently holding it.
        holder: TransactionId,
    },

    /// A segment expected to hold a buffer has none.
    #[error("segment is not mapped: {name}")]
    SegmentUnmapped {
        /// Name of the segment.
        name: String,
    },

    /// The transaction did not acquire the segment it tried to modify.
    #[error("{txn} did not acquire segment {handle}")]
    NotInTransaction {
        /// The transaction.
        txn: TransactionId,
        /// The segment handle.
        handle: SegmentHandle,
    },

    /// A declared region does not fit inside the segment.
    #[error("region {offset}+{len} exceeds mapped size {mapped_size}")]
    RegionOutOfBounds {
        /// Region start.
        offset: usize,
        /// Region length.
        len: usize,
        /// The segment's declared mapped size.
        mapped_size: usize,
    },

    /// The segment name cannot be used as a backing file name.
    #[error("invalid segment name {name:?}: {reason}")]
    InvalidSegmentName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The store still has live transactions.
    #[error("{store} has {live} live transaction(s)")]
    StoreBusy {
        /// The store.
        store: StoreId,
        /// Number of live transactions over it.
        live: usize,
    },
}

impl CoreError {
    /// Creates an invalid segment name error.
    pub fn invalid_segment_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSegmentName {
            name: name.into(),
            reason,
        }
    }

    /// Returns `true` for errors that indicate failed I/O or a violated
    /// caller contract, as opposed to a refusal the caller can react to.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyMapped { .. }
                | Self::SegmentNotMapped { .. }
                | Self::SegmentBusy { .. }
                | Self::InvalidSegmentName { .. }
                | Self::StoreBusy { .. }
        )
    }
}
