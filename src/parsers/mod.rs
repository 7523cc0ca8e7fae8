//! Record loaders for per-track streaming data files

mod json;
mod jsonl;

pub use json::JsonArrayParser;
pub use jsonl::JsonlParser;

use crate::types::{AtlasError, Result, TrackRecord};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single field value as it appears in the source data
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    #[allow(dead_code)] // Arrays and objects are accepted and dropped
    Nested(serde::de::IgnoredAny),
}

impl RawValue {
    /// Textual form of a scalar value; `None` for null and nested values
    fn into_text(self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::Float(f) => Some(float_text(f)),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Null | RawValue::Nested(_) => None,
        }
    }
}

/// Render a number the way it appears once stringified by the producing
/// scripts: exponent form outside `[1e-6, 1e21)`, e.g. `1e+21` and `1e-7`.
fn float_text(f: f64) -> String {
    let magnitude = f.abs();
    if f.is_finite() && magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{:e}", f);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    } else {
        f.to_string()
    }
}

/// One flat source object, keyed by field name
type RawRow = HashMap<String, RawValue>;

/// Convert a flat row into a record. Rows without a non-empty string
/// `country` are rejected.
fn record_from_row(mut row: RawRow) -> Option<TrackRecord> {
    let country = match row.remove("country") {
        Some(RawValue::Text(c)) if !c.is_empty() => c,
        _ => return None,
    };
    let streams = row.remove("streams").and_then(RawValue::into_text);
    let fields = row
        .into_iter()
        .filter_map(|(name, value)| value.into_text().map(|v| (name, v)))
        .collect();

    Some(TrackRecord {
        country,
        streams,
        fields,
    })
}

/// Trait for reading track records from one file format
pub trait RecordParser: Send + Sync {
    /// Parser name (e.g., "json")
    fn name(&self) -> &str;

    /// Lowercase file extensions this parser reads
    fn extensions(&self) -> &[&str];

    /// Parse a single file and return its records
    fn parse_file(&self, path: &Path) -> Result<Vec<TrackRecord>>;

    /// Whether this parser reads `path`, judged by extension
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions().iter().any(|ext| *ext == e))
    }
}

/// Result of loading records from all inputs
#[derive(Debug)]
pub struct LoadResult {
    /// Records in input order (file order, then row order)
    pub records: Vec<TrackRecord>,
    /// Files that parsed successfully
    pub files_read: usize,
    /// Files that were matched but could not be parsed
    pub files_failed: usize,
}

/// Registry of available parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn RecordParser>>,
}

impl ParserRegistry {
    /// Create a new registry with default parsers
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(JsonArrayParser), Box::new(JsonlParser)],
        }
    }

    /// Get all registered parsers
    pub fn parsers(&self) -> &[Box<dyn RecordParser>] {
        &self.parsers
    }

    /// Find a parser by name
    pub fn get(&self, name: &str) -> Option<&dyn RecordParser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Find the parser for a file by its extension
    pub fn for_path(&self, path: &Path) -> Option<&dyn RecordParser> {
        self.parsers
            .iter()
            .find(|p| p.handles(path))
            .map(|p| p.as_ref())
    }

    /// Expand inputs into concrete file paths.
    ///
    /// A directory contributes every readable file beneath it, a pattern
    /// containing glob characters is expanded, anything else is taken as a
    /// literal path.
    pub fn collect_files(&self, inputs: &[String]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            let path = Path::new(input);
            if path.is_dir() {
                let pattern = path.join("**").join("*");
                files.extend(
                    Self::expand_glob(&pattern.to_string_lossy())?
                        .into_iter()
                        .filter(|f| f.is_file() && self.for_path(f).is_some()),
                );
            } else if input.contains(['*', '?', '[']) {
                let matched = Self::expand_glob(input)?;
                if matched.is_empty() {
                    log::warn!("pattern {} matched no files", input);
                }
                files.extend(matched.into_iter().filter(|f| f.is_file()));
            } else {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob(pattern)
            .map_err(|e| AtlasError::Config(format!("invalid pattern {}: {}", pattern, e)))?;
        Ok(paths.filter_map(|e| e.ok()).collect())
    }

    /// Load records from all inputs, parsing files in parallel.
    ///
    /// Files that fail to parse are logged and skipped. Fails only when no
    /// file matched or every matched file failed; files that parse but hold
    /// no rows yield an empty result.
    pub fn load(&self, inputs: &[String]) -> Result<LoadResult> {
        let files = self.collect_files(inputs)?;
        if files.is_empty() {
            return Err(AtlasError::Parse(format!(
                "no input files matched {}",
                inputs.join(", ")
            )));
        }

        let per_file: Vec<Option<Vec<TrackRecord>>> = files
            .par_iter()
            .map(|f| {
                let Some(parser) = self.for_path(f) else {
                    log::warn!("no parser for {}, skipping", f.display());
                    return None;
                };
                match parser.parse_file(f) {
                    Ok(records) => {
                        log::info!("{}: {} records ({})", f.display(), records.len(), parser.name());
                        Some(records)
                    }
                    Err(e) => {
                        log::warn!("failed to parse {}: {}", f.display(), e);
                        None
                    }
                }
            })
            .collect();

        let files_failed = per_file.iter().filter(|r| r.is_none()).count();
        let files_read = per_file.len() - files_failed;
        let records: Vec<TrackRecord> = per_file.into_iter().flatten().flatten().collect();

        if files_read == 0 {
            return Err(AtlasError::Parse(
                "No input file could be parsed".into(),
            ));
        }
        if records.is_empty() {
            log::warn!("no track records found in {} input files", files_read);
        }

        Ok(LoadResult {
            records,
            files_read,
            files_failed,
        })
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
    }

    fn fixture(name: &str) -> String {
        fixtures_dir().join(name).to_string_lossy().into_owned()
    }

    fn row(json: &str) -> RawRow {
        serde_json::from_str(json).unwrap()
    }

    // ========== record_from_row ==========

    #[test]
    fn test_record_from_row_strings() {
        let record = record_from_row(row(
            r#"{"country":"Chile","streams":"120","danceability":"0.6","title":"Song"}"#,
        ))
        .unwrap();

        assert_eq!(record.country, "Chile");
        assert_eq!(record.streams.as_deref(), Some("120"));
        assert_eq!(record.fields.get("danceability").map(String::as_str), Some("0.6"));
        assert_eq!(record.fields.get("title").map(String::as_str), Some("Song"));
        assert!(!record.fields.contains_key("country"));
    }

    #[test]
    fn test_record_from_row_numbers_become_text() {
        let record =
            record_from_row(row(r#"{"country":"Chile","streams":120,"energy":0.5,"explicit":true}"#))
                .unwrap();

        assert_eq!(record.streams.as_deref(), Some("120"));
        assert_eq!(record.fields.get("energy").map(String::as_str), Some("0.5"));
        assert_eq!(record.fields.get("explicit").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_float_text_exponent_range() {
        assert_eq!(float_text(0.5), "0.5");
        assert_eq!(float_text(120.0), "120");
        assert_eq!(float_text(1e21), "1e+21");
        assert_eq!(float_text(-2.5e22), "-2.5e+22");
        assert_eq!(float_text(1e-7), "1e-7");
    }

    #[test]
    fn test_record_from_row_huge_streams_number() {
        let record = record_from_row(row(r#"{"country":"Chile","streams":1e21}"#)).unwrap();

        assert_eq!(record.streams.as_deref(), Some("1e+21"));
        assert_eq!(record.parsed_streams(), Some(1));
    }

    #[test]
    fn test_record_from_row_null_and_nested_dropped() {
        let record = record_from_row(row(
            r#"{"country":"Chile","streams":null,"energy":null,"artists":["a","b"]}"#,
        ))
        .unwrap();

        assert!(record.streams.is_none());
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_record_from_row_rejects_missing_country() {
        assert!(record_from_row(row(r#"{"streams":"1"}"#)).is_none());
        assert!(record_from_row(row(r#"{"country":"","streams":"1"}"#)).is_none());
        assert!(record_from_row(row(r#"{"country":7,"streams":"1"}"#)).is_none());
    }

    // ========== registry ==========

    #[test]
    fn test_registry_default_parsers() {
        let registry = ParserRegistry::new();
        assert_eq!(registry.parsers().len(), 2);
        assert!(registry.get("json").is_some());
        assert!(registry.get("jsonl").is_some());
        assert!(registry.get("csv").is_none());
    }

    #[test]
    fn test_for_path_by_extension() {
        let registry = ParserRegistry::new();
        assert_eq!(
            registry.for_path(Path::new("data/spotify.json")).map(|p| p.name()),
            Some("json")
        );
        assert_eq!(
            registry.for_path(Path::new("data/SPOTIFY.JSONL")).map(|p| p.name()),
            Some("jsonl")
        );
        assert_eq!(
            registry.for_path(Path::new("rows.ndjson")).map(|p| p.name()),
            Some("jsonl")
        );
        assert!(registry.for_path(Path::new("rows.csv")).is_none());
        assert!(registry.for_path(Path::new("README")).is_none());
    }

    #[test]
    fn test_collect_files_directory() {
        let registry = ParserRegistry::new();
        let files = registry
            .collect_files(&[fixtures_dir().to_string_lossy().into_owned()])
            .unwrap();
        // spotify-sample.json, spotify-sample.jsonl, malformed.json, empty.json
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_collect_files_glob() {
        let registry = ParserRegistry::new();
        let pattern = fixtures_dir().join("spotify-*").to_string_lossy().into_owned();
        let files = registry.collect_files(&[pattern]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_load_single_file() {
        let registry = ParserRegistry::new();
        let result = registry.load(&[fixture("spotify-sample.json")]).unwrap();

        assert_eq!(result.files_read, 1);
        assert_eq!(result.files_failed, 0);
        // 6 rows, one without a country
        assert_eq!(result.records.len(), 5);
    }

    #[test]
    fn test_load_keeps_input_order() {
        let registry = ParserRegistry::new();
        let result = registry
            .load(&[fixture("spotify-sample.jsonl"), fixture("spotify-sample.json")])
            .unwrap();

        assert_eq!(result.files_read, 2);
        // jsonl has 3 valid rows, json has 5
        assert_eq!(result.records.len(), 8);
        assert_eq!(result.records[0].country, "Argentina");
        assert_eq!(result.records[3].country, "Chile");
    }

    #[test]
    fn test_load_skips_malformed_file() {
        let registry = ParserRegistry::new();
        let result = registry
            .load(&[fixture("malformed.json"), fixture("spotify-sample.json")])
            .unwrap();

        assert_eq!(result.files_read, 1);
        assert_eq!(result.files_failed, 1);
        assert_eq!(result.records.len(), 5);
    }

    #[test]
    fn test_load_no_matching_files() {
        let registry = ParserRegistry::new();
        let pattern = fixtures_dir().join("nothing-*.json").to_string_lossy().into_owned();
        let result = registry.load(&[pattern]);
        assert!(matches!(result, Err(AtlasError::Parse(_))));
    }

    #[test]
    fn test_load_only_empty_input() {
        let registry = ParserRegistry::new();
        let result = registry.load(&[fixture("empty.json")]).unwrap();

        assert_eq!(result.files_read, 1);
        assert_eq!(result.files_failed, 0);
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_load_all_files_failed() {
        let registry = ParserRegistry::new();
        let result = registry.load(&[fixture("malformed.json")]);
        assert!(matches!(result, Err(AtlasError::Parse(_))));
    }

    #[test]
    fn test_load_missing_literal_path_counts_as_failed() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("rows.jsonl");
        fs::write(&good, "{\"country\":\"Peru\",\"streams\":\"3\"}\n").unwrap();
        let missing = tmp.path().join("missing.json");

        let registry = ParserRegistry::new();
        let result = registry
            .load(&[
                missing.to_string_lossy().into_owned(),
                good.to_string_lossy().into_owned(),
            ])
            .unwrap();

        assert_eq!(result.files_failed, 1);
        assert_eq!(result.records.len(), 1);
    }
}
