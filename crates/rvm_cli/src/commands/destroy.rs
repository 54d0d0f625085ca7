//! Destroy command implementation.

use rvm_core::Rvm;
use std::path::Path;
use tracing::info;

/// Deletes a segment's backing file.
pub fn run(path: &Path, segment: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Destroying segment {} in {:?}", segment, path);
    let mut rvm = Rvm::new();
    let store = rvm.init(path)?;
    rvm.destroy(store, segment)?;
    rvm.close(store)?;
    Ok(())
}
