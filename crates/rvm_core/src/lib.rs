//! # RVM Core
//!
//! Recoverable virtual memory: transactional, crash-consistent access to
//! named byte regions ("segments") backed by files.
//!
//! This crate provides:
//! - Store directories holding one backing file per segment
//! - Segment mapping into owned in-memory buffers
//! - Transactions with an in-memory undo log
//! - Commit by synchronous, fsynced writes to the backing files
//!
//! Everything is driven through a single [`Rvm`] context, which owns all
//! stores and transactions and hands out opaque handles.
//!
//! ## Durability
//!
//! A transaction is atomic with respect to [`Rvm::abort`]. It is not atomic
//! with respect to a crash during [`Rvm::commit`]: declared regions are
//! written and fsynced one at a time, so a crash between two of them
//! persists a prefix. There is no recovery pass on [`Rvm::init`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
pub mod dir;
mod error;
mod registry;
mod segment;
mod store;
mod transaction;
mod types;

pub use config::Config;
pub use context::Rvm;
pub use error::{CoreError, CoreResult};
pub use segment::{Segment, SegmentStatus};
pub use store::Store;
pub use transaction::{Region, Transaction};
pub use types::{SegmentHandle, StoreId, TransactionId};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
