//! Input record types and lenient numeric parsing

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Features averaged when none are configured explicitly
pub const DEFAULT_FEATURES: [&str; 2] = ["danceability", "energy"];

/// Default features under the primary-feature gate; energy is the gate
pub const GATED_DEFAULT_FEATURES: [&str; 2] = ["energy", "danceability"];

/// Name of a numeric audio feature field (e.g. "danceability")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(String);

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The default feature list, in output order
    pub fn defaults() -> Vec<Feature> {
        DEFAULT_FEATURES.iter().map(|f| Feature::new(*f)).collect()
    }

    /// The default feature list when records are gated on the first feature
    pub fn gated_defaults() -> Vec<Feature> {
        GATED_DEFAULT_FEATURES.iter().map(|f| Feature::new(*f)).collect()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Feature {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One row of source data: a single track's chart entry in one country.
///
/// All values are kept as raw text. Numeric interpretation happens at
/// aggregation time through [`parse_int`] and [`parse_float`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackRecord {
    /// Grouping key, used verbatim
    pub country: String,
    /// Raw `streams` text (`None` when the field is absent)
    pub streams: Option<String>,
    /// Every other field of the row, by name
    pub fields: HashMap<String, String>,
}

impl TrackRecord {
    pub fn new(country: impl Into<String>, streams: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            streams: Some(streams.into()),
            fields: HashMap::new(),
        }
    }

    /// Builder-style helper for attaching a raw field value
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Parsed stream count, `None` when absent or unparseable
    pub fn parsed_streams(&self) -> Option<i64> {
        self.streams.as_deref().and_then(parse_int)
    }

    /// Parsed value of a feature field, `None` when absent or unparseable
    pub fn feature_value(&self, feature: &Feature) -> Option<f64> {
        self.fields
            .get(feature.as_str())
            .and_then(|raw| parse_float(raw))
    }
}

fn skip_leading_whitespace(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Parse the leading integer of `raw`.
///
/// Accepts leading whitespace, an optional sign and either a `0x` hex run or
/// a decimal digit run. Anything after the digits is ignored, so `"12.7"`
/// yields 12 and `"42abc"` yields 42. Overflow saturates.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = skip_leading_whitespace(raw);
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if rest.starts_with("0x") || rest.starts_with("0X") {
        (16, &rest[2..])
    } else {
        (10, rest)
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        value = value
            .saturating_mul(i64::from(radix))
            .saturating_add(i64::from(d));
        seen_digit = true;
    }

    if !seen_digit {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Parse the longest leading decimal literal of `raw`.
///
/// Accepts leading whitespace, an optional sign, digits with an optional
/// fraction and exponent, or `Infinity`. Trailing text is ignored.
pub fn parse_float(raw: &str) -> Option<f64> {
    let s = skip_leading_whitespace(raw);
    let bytes = s.as_bytes();
    let len = bytes.len();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut j = frac_start;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if mantissa_digits + (j - frac_start) > 0 {
            mantissa_digits += j - frac_start;
            end = j;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut j = end + 1;
        if j < len && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[..end].parse::<f64>().ok()
}
