//! Write command implementation.

use super::backing_len;
use rvm_core::Rvm;
use std::path::Path;
use tracing::info;

/// Writes `data` at `offset` of a segment inside one committed transaction.
pub fn run(
    path: &Path,
    segment: &str,
    size: Option<usize>,
    offset: usize,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let needed = offset
        .checked_add(data.len())
        .ok_or("offset overflows")?;
    let size = size
        .or_else(|| backing_len(path, segment))
        .unwrap_or(needed)
        .max(needed);

    let mut rvm = Rvm::new();
    let store = rvm.init(path)?;
    let handle = rvm.map(store, segment, size)?;

    let txn = rvm.begin(store, &[handle])?;
    rvm.about_to_modify(txn, handle, offset, data.len())?;
    rvm.segment_mut(store, handle)?[offset..needed].copy_from_slice(data);
    rvm.commit(txn)?;

    info!(
        "Committed {} bytes at offset {} of segment {}",
        data.len(),
        offset,
        segment
    );

    rvm.unmap(store, handle)?;
    rvm.close(store)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_creates_and_commits() {
        let dir = tempdir().unwrap();
        run(dir.path(), "accounts", Some(16), 4, b"1234").unwrap();

        let on_disk = std::fs::read(dir.path().join("accounts")).unwrap();
        assert_eq!(on_disk.len(), 16);
        assert_eq!(&on_disk[4..8], b"1234");
    }

    #[test]
    fn write_grows_to_fit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("seg"), b"ab").unwrap();

        run(dir.path(), "seg", None, 2, b"cd").unwrap();
        assert_eq!(std::fs::read(dir.path().join("seg")).unwrap(), b"abcd");
    }
}
