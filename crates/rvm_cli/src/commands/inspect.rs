//! Inspect command implementation.

use rvm_core::dir::LOCK_FILE;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Whether the directory carries a lock file.
    pub has_lock_file: bool,
    /// Total size of all backing files in bytes.
    pub total_size: u64,
    /// One entry per backing file, sorted by name.
    pub segments: Vec<SegmentInfo>,
}

/// A single backing file.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment name.
    pub name: String,
    /// Backing file length in bytes.
    pub size: u64,
}

/// Collects the backing files of a store directory.
pub fn collect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No store directory at {:?}", path).into());
    }

    let mut segments = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == LOCK_FILE {
            continue;
        }
        segments.push(SegmentInfo {
            name,
            size: entry.metadata()?.len(),
        });
    }
    segments.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(InspectResult {
        path: path.display().to_string(),
        has_lock_file: path.join(LOCK_FILE).exists(),
        total_size: segments.iter().map(|s| s.size).sum(),
        segments,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("Segments: {}", result.segments.len());
    println!("Total size: {} bytes", result.total_size);
    for segment in &result.segments {
        println!("  {:<32} {:>12} bytes", segment.name, segment.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_lists_segments_without_lock_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b"), b"12").unwrap();
        std::fs::write(dir.path().join("a"), b"1").unwrap();
        std::fs::write(dir.path().join(LOCK_FILE), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let result = collect(dir.path()).unwrap();
        let names: Vec<_> = result.segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(result.total_size, 3);
        assert!(result.has_lock_file);
    }

    #[test]
    fn collect_reads_read_only_store() {
        let dir = tempdir().unwrap();
        let seg = dir.path().join("frozen");
        std::fs::write(&seg, b"1234").unwrap();
        let mut perms = std::fs::metadata(&seg).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&seg, perms).unwrap();

        let result = collect(dir.path()).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].size, 4);
        // Inspecting never creates files.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn collect_rejects_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(collect(&dir.path().join("missing")).is_err());
    }
}
