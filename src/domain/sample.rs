// Sample domain models - one timestamped value+quality reading for a tag
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signal quality attached to every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Bad,
    #[default]
    Uncertain,
}

impl Quality {
    /// Lenient wire parse; anything unrecognized reads as `Uncertain`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "good" => Quality::Good,
            "bad" => Quality::Bad,
            _ => Quality::Uncertain,
        }
    }
}

/// Raw tag value. Only numbers take part in aggregation and formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl SampleValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SampleValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue::Number(v)
    }
}

/// One reading. Immutable once recorded; a tag's current sample is replaced
/// wholesale on each update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: SampleValue,
    pub quality: Quality,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(value: SampleValue, quality: Quality, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            quality,
            timestamp,
        }
    }

    pub fn numeric(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(SampleValue::Number(value), Quality::Good, timestamp)
    }

    pub fn number(&self) -> Option<f64> {
        self.value.as_number()
    }
}

/// Ordered sequence of samples for one tag, ascending by timestamp.
pub type TagSeries = Vec<Sample>;
