//! Dump command implementation.

use super::backing_len;
use rvm_core::Rvm;
use std::path::Path;
use tracing::info;

const BYTES_PER_LINE: usize = 16;

/// Maps a segment and returns a copy of `[offset, offset + len)`.
///
/// The segment must already have a backing file, and `size` may not exceed
/// its length, so dumping never grows or creates a file.
pub fn read_range(
    path: &Path,
    segment: &str,
    size: Option<usize>,
    offset: usize,
    len: Option<usize>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let file_len = backing_len(path, segment)
        .ok_or_else(|| format!("segment {segment:?} has no backing file"))?;
    let size = size.unwrap_or(file_len);
    if size > file_len {
        return Err(format!(
            "size {size} exceeds backing file length {file_len} of segment {segment:?}"
        )
        .into());
    }

    let mut rvm = Rvm::new();
    let store = rvm.init(path)?;
    let handle = rvm.map(store, segment, size)?;
    let buffer = rvm.segment(store, handle)?;

    let len = len.unwrap_or_else(|| size.saturating_sub(offset));
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= buffer.len())
        .ok_or_else(|| format!("range {offset}+{len} exceeds segment size {size}"))?;
    let bytes = buffer[offset..end].to_vec();

    rvm.unmap(store, handle)?;
    rvm.close(store)?;
    Ok(bytes)
}

/// Formats bytes as `offset  hex  |ascii|` lines.
pub fn hex_dump(base: usize, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{:08x}  {:<width$}  |{}|",
                base + i * BYTES_PER_LINE,
                hex.join(" "),
                ascii,
                width = BYTES_PER_LINE * 3 - 1
            )
        })
        .collect()
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    segment: &str,
    size: Option<usize>,
    offset: usize,
    len: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Dumping segment {} from {:?}", segment, path);
    let bytes = read_range(path, segment, size, offset, len)?;
    for line in hex_dump(offset, &bytes) {
        println!("{line}");
    }
    Ok(())
}
