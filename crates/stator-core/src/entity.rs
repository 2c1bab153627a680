//! Measurement model.
//!
//! Collectors produce one [`PointsAt`] per call; the formatter turns each into
//! exposition text. None of these types are cached between requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Uint(u64),
    Float(f64),
}

impl fmt::Display for Value {
    /// Unsigned values render as plain digits, floats with two decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.2}"),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// A key/value pair attached to a point or a group of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub key: String,
    pub val: String,
}

impl Label {
    pub fn new(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }
}

/// Ordered labels. Insertion order is render order; duplicates are kept.
pub type Labels = Vec<Label>;

/// A single collected stat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub name: String,
    pub desc: String,
    /// Unit suffix for the metric name, may be empty.
    pub unit: String,
    /// Exposition type tag, e.g. "gauge".
    pub kind: String,
    pub labels: Labels,
    pub value: Value,
}

impl Point {
    /// A gauge point with no labels.
    pub fn gauge(
        name: impl Into<String>,
        desc: impl Into<String>,
        unit: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            unit: unit.into(),
            kind: "gauge".to_string(),
            labels: Labels::new(),
            value: value.into(),
        }
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }
}

/// Points with a common root name and labels, collected at the same time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsAt {
    pub name: String,
    pub stamp: DateTime<Utc>,
    /// Labels applied to every point in the group, rendered first.
    pub labels: Labels,
    pub points: Vec<Point>,
}

impl PointsAt {
    pub fn new(name: impl Into<String>, stamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            stamp,
            labels: Labels::new(),
            points: Vec::new(),
        }
    }
}

/// Unrelated point groups captured in one exposition pass.
pub type Stats = Vec<PointsAt>;

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch.
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// 0001-01-01T00:00:00Z, the "zero" capture time.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_renders_digits() {
        assert_eq!(Value::Uint(99).to_string(), "99");
        assert_eq!(Value::Uint(0).to_string(), "0");
        assert_eq!(Value::Uint(u64::MAX).to_string(), "18446744073709551615");
    }

    #[test]
    fn float_renders_two_decimals() {
        assert_eq!(Value::Float(99.999999).to_string(), "100.00");
        assert_eq!(Value::Float(2.5).to_string(), "2.50");
        assert_eq!(Value::Float(-1.234).to_string(), "-1.23");
        assert_eq!(Value::Float(0.0).to_string(), "0.00");
    }

    #[test]
    fn float_ties_round_to_even() {
        // 0.125 and 0.375 are exact in binary, so these are true ties.
        assert_eq!(Value::Float(0.125).to_string(), "0.12");
        assert_eq!(Value::Float(0.375).to_string(), "0.38");
        assert_eq!(Value::Float(-0.125).to_string(), "-0.12");
    }

    #[test]
    fn zero_time_millis() {
        assert_eq!(zero_time().timestamp_millis(), -62_135_596_800_000);
    }

    #[test]
    fn gauge_builder() {
        let pt = Point::gauge("size", "Total size", "bytes", 42u64)
            .with_labels(vec![Label::new("path", "/")]);
        assert_eq!(pt.kind, "gauge");
        assert_eq!(pt.value, Value::Uint(42));
        assert_eq!(pt.labels, vec![Label::new("path", "/")]);
    }
}
