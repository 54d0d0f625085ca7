//! The RVM context: the single owner of every store and transaction.

use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::registry::{IdGenerator, Registry};
use crate::store::Store;
use crate::transaction::Transaction;
use crate::types::{SegmentHandle, StoreId, TransactionId};
use rvm_storage::{BackendOpener, FileOpener};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A recoverable-virtual-memory context.
///
/// The context owns the store and transaction tables and hands out opaque
/// handles into them. Dropping the context unmaps every segment and
/// releases every directory; live transactions are discarded without
/// touching the backing files, which is equivalent to aborting them.
///
/// # Example
///
/// ```rust
/// use rvm_core::Rvm;
///
/// # let temp = tempfile::tempdir().unwrap();
/// # let dir = temp.path().join("db");
/// let mut rvm = Rvm::new();
/// let store = rvm.init(&dir)?;
/// let accounts = rvm.map(store, "accounts", 1024)?;
///
/// let txn = rvm.begin(store, &[accounts])?;
/// rvm.about_to_modify(txn, accounts, 0, 8)?;
/// rvm.segment_mut(store, accounts)?[..8].copy_from_slice(b"12345678");
/// rvm.commit(txn)?;
/// # Ok::<(), rvm_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct Rvm {
    config: Config,
    opener: Arc<dyn BackendOpener>,
    stores: Registry<StoreId, Store>,
    directories: HashMap<PathBuf, StoreId>,
    transactions: Registry<TransactionId, Transaction>,
    segment_ids: IdGenerator<SegmentHandle>,
}

impl Default for Rvm {
    fn default() -> Self {
        Self::new()
    }
}

impl Rvm {
    /// Creates a context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a context with the given configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::with_opener(config, Arc::new(FileOpener))
    }

    /// Creates a context whose segments are opened through `opener`.
    #[must_use]
    pub fn with_opener(config: Config, opener: Arc<dyn BackendOpener>) -> Self {
        Self {
            config,
            opener,
            stores: Registry::new(),
            directories: HashMap::new(),
            transactions: Registry::new(),
            segment_ids: IdGenerator::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens a store over `directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// - `DirectoryInUse` if the directory already backs a store in this context
    /// - `DirectoryLocked` if another owner holds the directory lock
    /// - `Io` if the directory cannot be created or opened
    pub fn init(&mut self, directory: impl AsRef<Path>) -> CoreResult<StoreId> {
        let directory = directory.as_ref();
        if directory.exists() {
            let canonical = StoreDir::canonical(directory)?;
            if self.directories.contains_key(&canonical) {
                return Err(CoreError::DirectoryInUse { path: canonical });
            }
        }

        let dir = StoreDir::open(
            directory,
            self.config.create_if_missing,
            self.config.lock_directory,
        )?;
        let canonical = dir.path().to_path_buf();
        if self.directories.contains_key(&canonical) {
            return Err(CoreError::DirectoryInUse { path: canonical });
        }

        let id = self.stores.allocate();
        let store = Store::new(id, dir, Arc::clone(&self.opener), &self.config);
        self.directories.insert(canonical.clone(), id);
        self.stores.insert(id, store);

        info!(store = %id, path = %canonical.display(), "initialized store");
        Ok(id)
    }

    /// Closes a store: unmaps its segments and releases its directory.
    ///
    /// # Errors
    ///
    /// - `UnknownStore` if the handle is not registered
    /// - `StoreBusy` if a live transaction holds any of its segments
    pub fn close(&mut self, store: StoreId) -> CoreResult<()> {
        if self.stores.get(&store).is_none() {
            return Err(CoreError::UnknownStore { store });
        }
        let live = self
            .transactions
            .values()
            .filter(|txn| txn.store() == store)
            .count();
        if live > 0 {
            return Err(CoreError::StoreBusy { store, live });
        }

        if let Some(mut closed) = self.stores.remove(&store) {
            closed.unmap_all();
            self.directories.remove(closed.path());
            info!(%store, path = %closed.path().display(), "closed store");
        }
        Ok(())
    }

    /// Returns the store behind a handle.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStore` if the handle is not registered.
    pub fn store(&self, store: StoreId) -> CoreResult<&Store> {
        self.stores
            .get(&store)
            .ok_or(CoreError::UnknownStore { store })
    }

    fn store_mut(&mut self, store: StoreId) -> CoreResult<&mut Store> {
        self.stores
            .get_mut(&store)
            .ok_or(CoreError::UnknownStore { store })
    }

    /// Maps the named segment, returning a handle to its buffer.
    ///
    /// The backing file is created if missing and extended to `size` bytes
    /// if shorter. The buffer holds exactly `size` bytes.
    ///
    /// # Errors
    ///
    /// - `AlreadyMapped` if the segment is mapped or held by a transaction
    /// - `InvalidSegmentName` if the name cannot be a file name
    /// - `UnknownStore`, `Storage` or `Io` otherwise
    pub fn map(&mut self, store: StoreId, name: &str, size: usize) -> CoreResult<SegmentHandle> {
        let handle = self.segment_ids.next_id();
        self.store_mut(store)?.map(name, size, handle)
    }

    /// Unmaps a segment, releasing its buffer and backing file.
    ///
    /// Unknown or already unmapped handles are ignored.
    ///
    /// # Errors
    ///
    /// - `SegmentAcquired` if a live transaction holds the segment
    /// - `UnknownStore` if the store handle is not registered
    pub fn unmap(&mut self, store: StoreId, handle: SegmentHandle) -> CoreResult<()> {
        self.store_mut(store)?.unmap(handle)
    }

    /// Deletes an unmapped segment's backing file.
    ///
    /// Does nothing while the segment is mapped or acquired. Deleting a
    /// segment that has no backing file is not an error.
    ///
    /// # Errors
    ///
    /// - `InvalidSegmentName` if the name cannot be a file name
    /// - `UnknownStore`, `Storage` or `Io` otherwise
    pub fn destroy(&mut self, store: StoreId, name: &str) -> CoreResult<()> {
        self.store_mut(store)?.destroy(name)
    }

    /// Returns a mapped segment's buffer.
    ///
    /// # Errors
    ///
    /// - `UnknownStore` if the store handle is not registered
    /// - `SegmentNotMapped` if the handle does not resolve
    pub fn segment(&self, store: StoreId, handle: SegmentHandle) -> CoreResult<&[u8]> {
        self.store(store)?
            .by_handle(handle)
            .and_then(|segment| segment.buffer())
            .ok_or(CoreError::SegmentNotMapped { handle })
    }

    /// Returns a mapped segment's buffer for writing.
    ///
    /// Writes only become durable when covered by a declared region of a
    /// committed transaction.
    ///
    /// # Errors
    ///
    /// - `UnknownStore` if the store handle is not registered
    /// - `SegmentNotMapped` if the handle does not resolve
    pub fn segment_mut(
        &mut self,
        store: StoreId,
        handle: SegmentHandle,
    ) -> CoreResult<&mut [u8]> {
        self.store_mut(store)?
            .by_handle_mut(handle)
            .and_then(|segment| segment.buffer_mut())
            .ok_or(CoreError::SegmentNotMapped { handle })
    }

    /// Begins a transaction holding every listed segment.
    ///
    /// Either all segments are acquired or none are.
    ///
    /// # Errors
    ///
    /// - `SegmentNotMapped` if a handle does not resolve to a mapped segment
    /// - `SegmentBusy` if another transaction holds a segment
    /// - `UnknownStore` if the store handle is not registered
    pub fn begin(
        &mut self,
        store: StoreId,
        handles: &[SegmentHandle],
    ) -> CoreResult<TransactionId> {
        let target = self
            .stores
            .get_mut(&store)
            .ok_or(CoreError::UnknownStore { store })?;
        if let Err(e) = target.check_acquirable(handles) {
            debug!(%store, error = %e, "begin refused");
            return Err(e);
        }

        let id = self.transactions.allocate();
        let held = target.acquire(handles, id);
        debug!(%store, txn = %id, segments = held.len(), "began transaction");
        self.transactions.insert(id, Transaction::new(id, store, held));
        Ok(id)
    }

    /// Returns a live transaction.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTransaction` if the handle is not live.
    pub fn transaction(&self, txn: TransactionId) -> CoreResult<&Transaction> {
        self.transactions
            .get(&txn)
            .ok_or(CoreError::UnknownTransaction { txn })
    }

    /// Declares that `[offset, offset + len)` of a held segment is about to
    /// be written, snapshotting its current contents.
    ///
    /// # Errors
    ///
    /// - `UnknownTransaction` if the transaction is not live
    /// - `NotInTransaction` if the transaction does not hold the segment
    /// - `RegionOutOfBounds` if the range exceeds the segment's mapped size
    pub fn about_to_modify(
        &mut self,
        txn: TransactionId,
        handle: SegmentHandle,
        offset: usize,
        len: usize,
    ) -> CoreResult<()> {
        let transaction = self
            .transactions
            .get_mut(&txn)
            .ok_or(CoreError::UnknownTransaction { txn })?;
        let store = transaction.store();
        let target = self
            .stores
            .get(&store)
            .ok_or(CoreError::UnknownStore { store })?;
        transaction.about_to_modify(target, handle, offset, len)
    }

    /// Commits a transaction: writes every declared range to its backing
    /// file, then returns the segments to `Mapped`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTransaction` if the transaction is not live, or the
    /// storage error that stopped the commit. A failed commit leaves the
    /// transaction live; it can be committed again or aborted.
    pub fn commit(&mut self, txn: TransactionId) -> CoreResult<()> {
        let transaction = self
            .transactions
            .get(&txn)
            .ok_or(CoreError::UnknownTransaction { txn })?;
        let store = transaction.store();
        let target = self
            .stores
            .get_mut(&store)
            .ok_or(CoreError::UnknownStore { store })?;

        if let Err(e) = transaction.commit(target, self.config.sync_on_commit) {
            warn!(%txn, error = %e, "commit failed");
            return Err(e);
        }

        target.release(transaction.segments());
        debug!(%txn, regions = transaction.regions().len(), "committed transaction");
        self.transactions.remove(&txn);
        Ok(())
    }

    /// Aborts a transaction: restores every declared range in memory, then
    /// returns the segments to `Mapped`. Backing files are not touched.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTransaction` if the transaction is not live.
    pub fn abort(&mut self, txn: TransactionId) -> CoreResult<()> {
        let transaction = self
            .transactions
            .get(&txn)
            .ok_or(CoreError::UnknownTransaction { txn })?;
        let store = transaction.store();
        let target = self
            .stores
            .get_mut(&store)
            .ok_or(CoreError::UnknownStore { store })?;

        transaction.abort(target)?;
        target.release(transaction.segments());
        debug!(%txn, regions = transaction.regions().len(), "aborted transaction");
        self.transactions.remove(&txn);
        Ok(())
    }

    /// Truncates the store's log.
    ///
    /// Commits write straight to the backing files, so there is no log and
    /// this only validates the handle.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStore` if the handle is not registered.
    pub fn truncate_log(&mut self, store: StoreId) -> CoreResult<()> {
        self.store(store)?;
        debug!(%store, "truncate_log: nothing to truncate");
        Ok(())
    }

    /// Returns the number of open stores.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Returns the number of live transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
