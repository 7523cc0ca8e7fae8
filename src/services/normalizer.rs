//! Country name normalization service
//!
//! Streaming charts and the world boundary dataset spell a handful of
//! countries differently. The map joins on exact names, so these are
//! rewritten before aggregation when requested.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::types::{AtlasError, Result, TrackRecord};

/// Known chart name → boundary dataset name pairs
const BUILTIN_ALIASES: [(&str, &str); 4] = [
    ("United States", "United States of America"),
    ("Czech Republic", "Czechia"),
    ("Dominican Republic", "Dominican Rep."),
    ("Korea", "South Korea"),
];

/// Normalize a country name using the built-in alias table.
///
/// # Examples
/// ```
/// use streamatlas::services::normalizer::normalize_country;
///
/// assert_eq!(normalize_country("Czech Republic"), "Czechia");
/// assert_eq!(normalize_country("Chile"), "Chile");
/// ```
pub fn normalize_country(name: &str) -> Cow<'_, str> {
    BUILTIN_ALIASES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| Cow::Borrowed(*to))
        .unwrap_or(Cow::Borrowed(name))
}

/// Alias table combining user renames with the built-in aliases
#[derive(Debug, Clone, Default)]
pub struct CountryNormalizer {
    renames: HashMap<String, String>,
    builtin: bool,
}

impl CountryNormalizer {
    /// Normalizer that applies the built-in aliases
    pub fn new() -> Self {
        Self {
            renames: HashMap::new(),
            builtin: true,
        }
    }

    /// Normalizer that only applies explicit renames
    pub fn renames_only() -> Self {
        Self::default()
    }

    /// Add a `FROM=TO` rename. Explicit renames win over built-in aliases.
    pub fn add_rename(&mut self, pair: &str) -> Result<()> {
        let (from, to) = pair
            .split_once('=')
            .ok_or_else(|| AtlasError::Config(format!("rename `{}` is not FROM=TO", pair)))?;
        if from.is_empty() || to.is_empty() {
            return Err(AtlasError::Config(format!(
                "rename `{}` has an empty side",
                pair
            )));
        }
        self.renames.insert(from.to_string(), to.to_string());
        Ok(())
    }

    pub fn is_noop(&self) -> bool {
        !self.builtin && self.renames.is_empty()
    }

    pub fn normalize<'a>(&'a self, name: &'a str) -> Cow<'a, str> {
        if let Some(to) = self.renames.get(name) {
            return Cow::Borrowed(to.as_str());
        }
        if self.builtin {
            normalize_country(name)
        } else {
            Cow::Borrowed(name)
        }
    }

    /// Rewrite each record's country in place. Returns the number changed.
    pub fn apply(&self, records: &mut [TrackRecord]) -> usize {
        if self.is_noop() {
            return 0;
        }
        let mut changed = 0;
        for record in records.iter_mut() {
            let normalized = self.normalize(&record.country);
            if normalized != record.country.as_str() {
                let to = normalized.into_owned();
                record.country = to;
                changed += 1;
            }
        }
        changed
    }
}
