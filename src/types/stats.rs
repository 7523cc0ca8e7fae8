//! Summary statistics a map renderer needs from a country table

use serde::Serialize;

use super::{CountryTable, Feature};

/// Observed range of one feature's per-country means
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureRange {
    pub feature: Feature,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapStats {
    pub country_count: usize,
    pub total_streams: i64,
    /// Upper bound of the color-scale domain
    pub max_streams: Option<i64>,
    pub peak_country: Option<String>,
    pub poisoned_countries: usize,
    pub feature_ranges: Vec<FeatureRange>,
}

impl MapStats {
    pub fn from_table(table: &CountryTable) -> Self {
        let mut total_streams: i64 = 0;
        let mut peak: Option<(&str, i64)> = None;
        let mut poisoned_countries = 0;

        for (country, aggregate) in table.iter() {
            let Some(streams) = aggregate.streams.value() else {
                poisoned_countries += 1;
                continue;
            };
            total_streams = total_streams.saturating_add(streams);

            match peak {
                None => peak = Some((country, streams)),
                Some((_, max)) if streams > max => peak = Some((country, streams)),
                _ => {}
            }
        }

        let feature_ranges = table
            .features()
            .iter()
            .filter_map(|feature| {
                let means = table
                    .iter()
                    .filter_map(|(_, agg)| agg.feature(feature.as_str()))
                    .filter(|m| !m.is_nan());
                let (min, max) = means.fold(None, |acc: Option<(f64, f64)>, m| match acc {
                    None => Some((m, m)),
                    Some((lo, hi)) => Some((lo.min(m), hi.max(m))),
                })?;
                Some(FeatureRange {
                    feature: feature.clone(),
                    min,
                    max,
                })
            })
            .collect();

        Self {
            country_count: table.len(),
            total_streams,
            max_streams: peak.map(|(_, max)| max),
            peak_country: peak.map(|(country, _)| country.to_string()),
            poisoned_countries,
            feature_ranges,
        }
    }
}
