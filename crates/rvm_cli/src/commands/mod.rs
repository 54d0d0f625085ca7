//! CLI command implementations.

pub mod destroy;
pub mod dump;
pub mod inspect;
pub mod write;

use std::path::Path;

/// Returns the length of a segment's backing file, if it exists and fits
/// in memory.
fn backing_len(store: &Path, segment: &str) -> Option<usize> {
    std::fs::metadata(store.join(segment))
        .ok()
        .and_then(|m| usize::try_from(m.len()).ok())
}
