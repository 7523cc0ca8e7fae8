//! Output file service for country tables

use crate::types::{AtlasError, CountryTable, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Serialize a table. Compact output matches what the map page imports.
pub fn to_json(table: &CountryTable, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(table)
    } else {
        serde_json::to_string(table)
    };
    json.map_err(|e| AtlasError::Output(format!("Serialization failed: {}", e)))
}

/// Write a table to `path` via temp file + rename, holding an exclusive
/// lock on the target while it is replaced.
pub fn write_table(path: &Path, table: &CountryTable, pretty: bool) -> Result<()> {
    let content = to_json(table, pretty)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");

    {
        let mut file = File::create(&temp_path)
            .map_err(|e| AtlasError::Output(format!("Failed to create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| AtlasError::Output(format!("Failed to write temp file: {}", e)))?;
        file.sync_all()
            .map_err(|e| AtlasError::Output(format!("Failed to sync temp file: {}", e)))?;
    }

    let target = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    target
        .lock_exclusive()
        .map_err(|e| AtlasError::Output(format!("Failed to acquire write lock: {}", e)))?;

    fs::rename(&temp_path, path)
        .map_err(|e| AtlasError::Output(format!("Failed to rename temp file: {}", e)))?;

    let _ = target.unlock();
    log::info!("wrote {} countries to {}", table.len(), path.display());
    Ok(())
}

/// Read a previously written table (either output shape)
pub fn read_table(path: &Path) -> Result<CountryTable> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AtlasError::Parse(format!("{}: {}", path.display(), e)))
}
