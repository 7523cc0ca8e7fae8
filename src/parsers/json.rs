//! Parser for a JSON file holding one array of flat track objects

use crate::types::{AtlasError, Result, TrackRecord};
use std::fs;
use std::path::Path;

use super::{record_from_row, RawRow, RecordParser};

/// Parser for `[{"country": ..., "streams": ..., ...}, ...]` files
pub struct JsonArrayParser;

impl RecordParser for JsonArrayParser {
    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<TrackRecord>> {
        let mut bytes = fs::read(path).map_err(AtlasError::Io)?;
        let rows: Vec<RawRow> =
            simd_json::from_slice(&mut bytes).map_err(|e| AtlasError::Parse(e.to_string()))?;

        let total = rows.len();
        let records: Vec<TrackRecord> = rows.into_iter().filter_map(record_from_row).collect();

        let skipped = total - records.len();
        if skipped > 0 {
            log::warn!(
                "{}: skipped {} rows without a country",
                path.display(),
                skipped
            );
        }

        Ok(records)
    }
}
