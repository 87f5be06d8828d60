//! Store file persistence.
//!
//! The whole store is one JSON document. Saves write a sibling temp file and
//! rename it over the target so a crash never leaves a half-written store.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::store::{CurveStore, StoreSnapshot};

/// Load a store file. A missing file yields an empty store.
pub fn load_store(path: &Path) -> Result<CurveStore, AppError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "store file missing, starting empty");
        return Ok(CurveStore::new());
    }
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open store '{}': {e}", path.display())))?;
    let snapshot: StoreSnapshot = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid store file '{}': {e}", path.display())))?;
    Ok(CurveStore::from_snapshot(snapshot))
}

/// Persist the store atomically (temp file + rename).
pub fn save_store(path: &Path, store: &CurveStore) -> Result<(), AppError> {
    let tmp = temp_path(path);
    let file = File::create(&tmp)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", tmp.display())))?;
    serde_json::to_writer_pretty(file, &store.snapshot())
        .map_err(|e| AppError::new(2, format!("Failed to write store: {e}")))?;
    fs::rename(&tmp, path)
        .map_err(|e| AppError::new(2, format!("Failed to replace store '{}': {e}", path.display())))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
