//! Aggregator service folding track records into per-country summaries

use crate::types::{
    AtlasError, CountryAggregate, CountryTable, Feature, FeatureMean, Result, StreamTotal,
    TrackRecord,
};
use std::collections::{HashMap, HashSet};

/// Decides whether a record takes part in aggregation at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityGate {
    /// Every record is folded in
    #[default]
    Lax,
    /// Records whose primary (first configured) feature does not parse are skipped entirely
    PrimaryFeature,
}

/// What an unparseable `streams` value does to its country's total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidStreams {
    /// The total becomes `Poisoned` and stays that way
    #[default]
    Poison,
    /// The value is ignored
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub features: Vec<Feature>,
    pub gate: ValidityGate,
    pub invalid_streams: InvalidStreams,
}

impl AggregateOptions {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            gate: ValidityGate::default(),
            invalid_streams: InvalidStreams::default(),
        }
    }

    /// Totals only, no feature means
    pub fn streams_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_gate(mut self, gate: ValidityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_invalid_streams(mut self, policy: InvalidStreams) -> Self {
        self.invalid_streams = policy;
        self
    }

    pub fn primary_feature(&self) -> Option<&Feature> {
        self.features.first()
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate == ValidityGate::PrimaryFeature && self.features.is_empty() {
            return Err(AtlasError::Config(
                "the primary-feature gate needs at least one feature".into(),
            ));
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.as_str() == "streams" {
                return Err(AtlasError::Config(
                    "`streams` cannot be used as a feature name".into(),
                ));
            }
            if !seen.insert(feature.as_str()) {
                return Err(AtlasError::Config(format!(
                    "feature `{}` listed more than once",
                    feature
                )));
            }
        }
        Ok(())
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self::new(Feature::defaults())
    }
}

/// Running sum and count for one feature
#[derive(Debug, Clone, Copy, Default)]
struct FeatureSum {
    sum: f64,
    count: u64,
}

impl FeatureSum {
    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CountryAccumulator {
    streams: StreamTotal,
    sums: Vec<FeatureSum>,
}

impl CountryAccumulator {
    fn new(feature_count: usize) -> Self {
        Self {
            streams: StreamTotal::default(),
            sums: vec![FeatureSum::default(); feature_count],
        }
    }

    fn finalize(self, features: &[Feature]) -> CountryAggregate {
        CountryAggregate {
            streams: self.streams,
            features: features
                .iter()
                .zip(&self.sums)
                .map(|(feature, sum)| FeatureMean {
                    feature: feature.clone(),
                    mean: sum.mean(),
                })
                .collect(),
        }
    }
}

/// Aggregator for per-country statistics
pub struct Aggregator;

impl Aggregator {
    /// Fold records into a table keyed by country (first-occurrence order).
    ///
    /// Unparseable values never fail the call: feature values that do not
    /// parse are left out of their mean, and `streams` values that do not
    /// parse follow `options.invalid_streams`.
    pub fn aggregate(records: &[TrackRecord], options: &AggregateOptions) -> CountryTable {
        let features = &options.features;
        let mut order: Vec<(&str, CountryAccumulator)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut gated: u64 = 0;

        for record in records {
            if options.gate == ValidityGate::PrimaryFeature {
                let passes = options
                    .primary_feature()
                    .is_some_and(|primary| record.feature_value(primary).is_some());
                if !passes {
                    gated += 1;
                    continue;
                }
            }

            let slot = *index.entry(record.country.as_str()).or_insert_with(|| {
                order.push((
                    record.country.as_str(),
                    CountryAccumulator::new(features.len()),
                ));
                order.len() - 1
            });
            let acc = &mut order[slot].1;

            match (record.parsed_streams(), options.invalid_streams) {
                (Some(streams), _) => acc.streams.add(streams),
                (None, InvalidStreams::Poison) => acc.streams.poison(),
                (None, InvalidStreams::Skip) => {}
            }

            for (feature, sum) in features.iter().zip(acc.sums.iter_mut()) {
                if let Some(value) = record.feature_value(feature) {
                    sum.sum += value;
                    sum.count += 1;
                }
            }
        }

        if gated > 0 {
            log::debug!("validity gate skipped {} of {} records", gated, records.len());
        }

        let mut table = CountryTable::new(features.clone());
        for (country, acc) in order {
            table.insert(country.to_string(), acc.finalize(features));
        }

        let poisoned = table.iter().filter(|(_, a)| a.streams.is_poisoned()).count();
        if poisoned > 0 {
            log::debug!("{} countries have a poisoned stream total", poisoned);
        }

        table
    }
}
