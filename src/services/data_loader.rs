//! Data loading service: input files → normalized track records

use crate::parsers::{LoadResult, ParserRegistry};
use crate::services::normalizer::CountryNormalizer;
use crate::types::Result;

/// Loads track records from the configured inputs and applies country
/// name normalization before they reach the aggregator
pub struct DataLoaderService {
    registry: ParserRegistry,
    normalizer: CountryNormalizer,
}

impl DataLoaderService {
    /// Create a loader that leaves country names untouched
    pub fn new() -> Self {
        Self {
            registry: ParserRegistry::new(),
            normalizer: CountryNormalizer::renames_only(),
        }
    }

    pub fn with_normalizer(normalizer: CountryNormalizer) -> Self {
        Self {
            registry: ParserRegistry::new(),
            normalizer,
        }
    }

    pub fn load(&self, inputs: &[String]) -> Result<LoadResult> {
        let mut result = self.registry.load(inputs)?;

        if result.files_failed > 0 {
            log::warn!(
                "{} of {} input files could not be read",
                result.files_failed,
                result.files_failed + result.files_read
            );
        }

        let renamed = self.normalizer.apply(&mut result.records);
        if renamed > 0 {
            log::info!("normalized country names on {} records", renamed);
        }

        log::info!(
            "loaded {} records from {} files",
            result.records.len(),
            result.files_read
        );
        Ok(result)
    }
}

impl Default for DataLoaderService {
    fn default() -> Self {
        Self::new()
    }
}
