//! Property-based test generators using proptest.
//!
//! Provides strategies for segment names and for sequences of region
//! declarations that always fit inside a segment.

use proptest::prelude::*;

/// A generated modification: declare `[offset, offset + data.len())`, then
/// write `data` there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start of the range.
    pub offset: usize,
    /// Bytes written after the declaration.
    pub data: Vec<u8>,
}

impl Edit {
    /// End of the range (exclusive).
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    /// Returns `true` if the two ranges share at least one byte.
    pub fn overlaps(&self, other: &Edit) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Strategy for generating valid segment names.
pub fn segment_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.-]{0,31}").expect("Invalid regex")
}

/// Strategy for generating initial segment contents of exactly `size` bytes.
pub fn contents_strategy(size: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), size)
}

/// Strategy for one edit that fits inside a segment of `size` bytes.
///
/// An offset equal to `size` yields an empty edit, so a zero-sized segment
/// only ever gets empty edits.
pub fn edit_strategy(size: usize) -> impl Strategy<Value = Edit> {
    (0..=size).prop_flat_map(move |offset| {
        prop::collection::vec(any::<u8>(), 0..=(size - offset))
            .prop_map(move |data| Edit { offset, data })
    })
}

/// Strategy for up to `max` edits inside a segment of `size` bytes.
pub fn edits_strategy(size: usize, max: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit_strategy(size), 0..=max)
}

/// Strategy for up to `max` pairwise non-overlapping edits.
pub fn disjoint_edits_strategy(size: usize, max: usize) -> impl Strategy<Value = Vec<Edit>> {
    edits_strategy(size, max).prop_map(|edits| {
        let mut kept: Vec<Edit> = Vec::new();
        for edit in edits {
            if !kept.iter().any(|k| k.overlaps(&edit)) {
                kept.push(edit);
            }
        }
        kept
    })
}
