//! Per-country aggregate types and their output file shape

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use super::Feature;

/// Total streams for one country.
///
/// `Poisoned` records that an unparseable `streams` value was folded in.
/// It serializes as `null`, the same way a NaN total is written by
/// `JSON.stringify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTotal {
    Valid(i64),
    Poisoned,
}

impl StreamTotal {
    pub fn add(&mut self, streams: i64) {
        if let StreamTotal::Valid(total) = self {
            *total = total.saturating_add(streams);
        }
    }

    pub fn poison(&mut self) {
        *self = StreamTotal::Poisoned;
    }

    /// The total, or `None` when poisoned
    pub fn value(&self) -> Option<i64> {
        match self {
            StreamTotal::Valid(total) => Some(*total),
            StreamTotal::Poisoned => None,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        matches!(self, StreamTotal::Poisoned)
    }
}

impl Default for StreamTotal {
    fn default() -> Self {
        StreamTotal::Valid(0)
    }
}

impl Serialize for StreamTotal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StreamTotal::Valid(total) => serializer.serialize_i64(*total),
            StreamTotal::Poisoned => serializer.serialize_none(),
        }
    }
}

/// Finalized mean of one feature within a country
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMean {
    pub feature: Feature,
    pub mean: f64,
}

/// Per-country rollup of total streams and mean feature values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryAggregate {
    pub streams: StreamTotal,
    /// Feature means in configured order
    pub features: Vec<FeatureMean>,
}

impl CountryAggregate {
    /// Mean of the named feature, if that feature was tracked
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|f| f.feature.as_str() == name)
            .map(|f| f.mean)
    }
}

impl Serialize for CountryAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.features.len()))?;
        map.serialize_entry("streams", &self.streams)?;
        for f in &self.features {
            map.serialize_entry(f.feature.as_str(), &f.mean)?;
        }
        map.end()
    }
}

/// Reads either output shape: a plain total or a `{streams, feature...}` object
impl<'de> Deserialize<'de> for CountryAggregate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CountryAggregateVisitor)
    }
}

struct CountryAggregateVisitor;

impl CountryAggregateVisitor {
    fn total(streams: StreamTotal) -> CountryAggregate {
        CountryAggregate {
            streams,
            features: Vec::new(),
        }
    }
}

fn total_from_json(value: &serde_json::Value) -> Option<StreamTotal> {
    match value {
        serde_json::Value::Null => Some(StreamTotal::Poisoned),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .map(StreamTotal::Valid),
        _ => None,
    }
}

impl<'de> Visitor<'de> for CountryAggregateVisitor {
    type Value = CountryAggregate;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a stream total or an object with a `streams` field")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Self::total(StreamTotal::Valid(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Self::total(StreamTotal::Valid(
            i64::try_from(v).unwrap_or(i64::MAX),
        )))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() {
            Ok(Self::total(StreamTotal::Valid(v as i64)))
        } else {
            Ok(Self::total(StreamTotal::Poisoned))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Self::total(StreamTotal::Poisoned))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Self::total(StreamTotal::Poisoned))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut streams = None;
        let mut features = Vec::new();

        while let Some(key) = access.next_key::<String>()? {
            if key == "streams" {
                let raw: serde_json::Value = access.next_value()?;
                let total = total_from_json(&raw)
                    .ok_or_else(|| de::Error::custom("`streams` must be a number or null"))?;
                streams = Some(total);
            } else {
                let mean: Option<f64> = access.next_value()?;
                features.push(FeatureMean {
                    feature: Feature::new(key),
                    mean: mean.unwrap_or(f64::NAN),
                });
            }
        }

        let streams = streams.ok_or_else(|| de::Error::missing_field("streams"))?;
        Ok(CountryAggregate { streams, features })
    }
}

/// Output mapping from country name to aggregate.
///
/// Iteration follows first-occurrence order; lookups go through a name index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryTable {
    features: Vec<Feature>,
    entries: Vec<(String, CountryAggregate)>,
    index: HashMap<String, usize>,
}

impl CountryTable {
    /// Create an empty table for the given feature list
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or replace a country's aggregate. A replaced entry keeps its position.
    pub fn insert(&mut self, country: String, aggregate: CountryAggregate) {
        match self.index.get(&country) {
            Some(&i) => self.entries[i].1 = aggregate,
            None => {
                self.index.insert(country.clone(), self.entries.len());
                self.entries.push((country, aggregate));
            }
        }
    }

    pub fn get(&self, country: &str) -> Option<&CountryAggregate> {
        self.index.get(country).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, country: &str) -> bool {
        self.index.contains_key(country)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked features, in output order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// True when entries serialize as plain stream totals
    pub fn is_streams_only(&self) -> bool {
        self.features.is_empty()
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CountryAggregate)> {
        self.entries.iter().map(|(name, agg)| (name.as_str(), agg))
    }
}

impl Serialize for CountryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (country, aggregate) in &self.entries {
            if self.is_streams_only() {
                map.serialize_entry(country, &aggregate.streams)?;
            } else {
                map.serialize_entry(country, aggregate)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CountryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CountryTableVisitor)
    }
}

struct CountryTableVisitor;

impl<'de> Visitor<'de> for CountryTableVisitor {
    type Value = CountryTable;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object keyed by country name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = CountryTable::default();
        while let Some((country, aggregate)) = access.next_entry::<String, CountryAggregate>()? {
            // Feature order is taken from the first detailed entry
            if table.features.is_empty() && !aggregate.features.is_empty() {
                table.features = aggregate
                    .features
                    .iter()
                    .map(|f| f.feature.clone())
                    .collect();
            }
            table.insert(country, aggregate);
        }
        Ok(table)
    }
}
