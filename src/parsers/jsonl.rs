//! Parser for newline-delimited JSON track rows

use crate::types::{AtlasError, Result, TrackRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{record_from_row, RawRow, RecordParser};

/// Parser for files with one flat track object per line
pub struct JsonlParser;

impl JsonlParser {
    /// Parse a single non-blank line. `None` for malformed or country-less lines.
    fn parse_line(&self, line: &mut [u8]) -> Option<TrackRecord> {
        let row: RawRow = simd_json::from_slice(line).ok()?;
        record_from_row(row)
    }
}

impl RecordParser for JsonlParser {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn extensions(&self) -> &[&str] {
        &["jsonl", "ndjson"]
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<TrackRecord>> {
        let file = File::open(path).map_err(AtlasError::Io)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        // Stream line-by-line to avoid loading entire file into memory
        for (line_no, line_result) in reader.lines().enumerate() {
            let line = match line_result {
                Ok(line) => line,
                Err(e) => {
                    log::warn!(
                        "{}:{}: skipping unreadable row: {}",
                        path.display(),
                        line_no + 1,
                        e
                    );
                    skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let mut line_bytes = line.into_bytes();
            match self.parse_line(&mut line_bytes) {
                Some(record) => records.push(record),
                None => {
                    log::warn!("{}:{}: skipping unreadable row", path.display(), line_no + 1);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!("{}: skipped {} rows", path.display(), skipped);
        }

        Ok(records)
    }
}
