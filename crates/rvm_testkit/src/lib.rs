//! # RVM Testkit
//!
//! Test utilities for RVM.
//!
//! This crate provides:
//! - Test fixtures: a context plus a store over a temporary directory
//! - Property-based test generators using proptest
//! - A fault-injecting backend opener for exercising failed commits
//!
//! ## Usage
//!
//! ```rust
//! use rvm_testkit::prelude::*;
//!
//! let mut t = TestStore::new();
//! let seg = t.map("accounts", 64);
//! let txn = t.rvm.begin(t.store, &[seg]).unwrap();
//! t.rvm.about_to_modify(txn, seg, 0, 4).unwrap();
//! t.write(seg, 0, b"abcd");
//! t.rvm.commit(txn).unwrap();
//! assert_eq!(&t.file_bytes("accounts")[..4], b"abcd");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
