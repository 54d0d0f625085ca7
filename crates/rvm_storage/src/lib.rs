//! # RVM Storage
//!
//! Storage backend trait and implementations for RVM.
//!
//! This crate provides the lowest-level storage abstraction behind a
//! segment. Storage backends are **opaque byte stores** - they do not know
//! about segments, transactions or before-images.
//!
//! ## Design Principles
//!
//! - Backends are simple positional byte stores (read, write, extend, sync)
//! - No knowledge of segment status or transaction state
//! - Must be `Send + Sync`
//! - The segment engine owns all interpretation of the bytes
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! Backends are created through a [`BackendOpener`], which lets a store be
//! pointed at something other than the local file system in tests.
//!
//! ## Example
//!
//! ```rust
//! use rvm_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.extend_to(16).unwrap();
//! backend.write_at(4, b"rvm!").unwrap();
//! assert_eq!(backend.read_at(4, 4).unwrap(), b"rvm!");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod opener;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use opener::{BackendOpener, FileOpener};
