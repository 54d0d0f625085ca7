//! File-backed segments.
//!
//! A segment is a named byte region whose durable copy lives in one backing
//! file. While mapped, the segment record exclusively owns both the
//! in-memory buffer and the open backend.

mod record;

pub use record::{Segment, SegmentStatus};
