//! Transactions over mapped segments.
//!
//! A transaction holds its segments exclusively from `begin` until it ends.
//! Every `about_to_modify` call snapshots the declared range into an
//! in-memory undo log:
//! - **Commit** writes the current buffer contents of each declared range
//!   straight to the backing file, fsyncing after each one
//! - **Abort** copies the snapshots back into the buffers; files are untouched
//!
//! Commit is atomic with respect to abort but not with respect to a crash
//! between two region writes. There is no redo log and no recovery pass.

mod state;

pub use state::{Region, Transaction};
