//! Shared metric type definitions
//!
//! This crate contains the types exchanged between the statsd host side, the
//! flush reducer and the Ganglia exporter: the per-flush snapshot of raw
//! accumulators, metric descriptors and the records handed to a sink.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Derived statistics produced by one flush, keyed by generated metric name.
pub type DerivedStats = BTreeMap<String, f64>;

/// Immutable input to one flush cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricSnapshot {
    /// Counter values accumulated since the last flush
    pub counters: HashMap<String, f64>,
    /// Last value set for each gauge
    pub gauges: HashMap<String, f64>,
    /// Timer samples observed since the last flush, unordered
    pub timers: HashMap<String, Vec<f64>>,
    /// Configured percentile thresholds, e.g. `[90.0, 99.5]`
    pub percent_thresholds: Vec<f64>,
    /// Flush interval in milliseconds
    pub flush_interval_ms: u64,
}

/// Ganglia slope of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Slope {
    Zero,
    Positive,
    Negative,
    #[default]
    Both,
    Unspecified,
}

impl Slope {
    /// Numeric code used on the gmetric wire.
    pub fn code(self) -> u32 {
        match self {
            Slope::Zero => 0,
            Slope::Positive => 1,
            Slope::Negative => 2,
            Slope::Both => 3,
            Slope::Unspecified => 4,
        }
    }
}

impl std::fmt::Display for Slope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Slope::Zero => "zero",
            Slope::Positive => "positive",
            Slope::Negative => "negative",
            Slope::Both => "both",
            Slope::Unspecified => "unspecified",
        };
        f.write_str(s)
    }
}

/// Ganglia value type of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    String,
    Int8,
    Uint8,
    Int16,
    Uint16,
    #[default]
    Int32,
    Uint32,
    Float,
    Double,
}

impl MetricType {
    /// Whether values of this type are rendered as integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            MetricType::Int8
                | MetricType::Uint8
                | MetricType::Int16
                | MetricType::Uint16
                | MetricType::Int32
                | MetricType::Uint32
        )
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricType::String => "string",
            MetricType::Int8 => "int8",
            MetricType::Uint8 => "uint8",
            MetricType::Int16 => "int16",
            MetricType::Uint16 => "uint16",
            MetricType::Int32 => "int32",
            MetricType::Uint32 => "uint32",
            MetricType::Float => "float",
            MetricType::Double => "double",
        };
        f.write_str(s)
    }
}

/// Presentation of one derived stat in the Ganglia frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Display name
    pub name: String,
    /// Group the metric appears under
    pub group: String,
    /// Units label
    pub units: String,
    pub slope: Slope,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

impl MetricDescriptor {
    /// Default descriptor for a derived stat: units `count`, slope `both`,
    /// type `int32`.
    pub fn with_defaults(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            units: "count".to_string(),
            slope: Slope::Both,
            metric_type: MetricType::Int32,
        }
    }

    /// Overlay the fields `over` explicitly sets.
    pub fn apply(&mut self, over: &MetricOverride) {
        if let Some(name) = &over.name {
            self.name = name.clone();
        }
        if let Some(group) = &over.group {
            self.group = group.clone();
        }
        if let Some(units) = &over.units {
            self.units = units.clone();
        }
        if let Some(slope) = over.slope {
            self.slope = slope;
        }
        if let Some(metric_type) = over.metric_type {
            self.metric_type = metric_type;
        }
    }
}

/// Per-name override; unset fields keep their defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricOverride {
    pub name: Option<String>,
    pub group: Option<String>,
    pub units: Option<String>,
    pub slope: Option<Slope>,
    #[serde(rename = "type")]
    pub metric_type: Option<MetricType>,
}

/// One outbound unit handed to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    /// Spoof identity when configured, otherwise the presentation hostname
    pub hostname: String,
    pub group: String,
    /// True iff a spoof identity is configured
    pub spoof: bool,
    pub units: String,
    pub slope: Slope,
    /// Display name
    pub name: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub tmax: u32,
    pub dmax: u32,
}

impl SinkRecord {
    pub fn new(hostname: String, spoof: bool, descriptor: MetricDescriptor, value: f64) -> Self {
        Self {
            hostname,
            group: descriptor.group,
            spoof,
            units: descriptor.units,
            slope: descriptor.slope,
            name: descriptor.name,
            value,
            metric_type: descriptor.metric_type,
            tmax: 0,
            dmax: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_only_group_keeps_defaults() {
        let mut descriptor = MetricDescriptor::with_defaults("stats_hits", "StatsD");
        descriptor.apply(&MetricOverride {
            group: Some("web".to_string()),
            ..Default::default()
        });

        assert_eq!(descriptor.name, "stats_hits");
        assert_eq!(descriptor.group, "web");
        assert_eq!(descriptor.units, "count");
        assert_eq!(descriptor.slope, Slope::Both);
        assert_eq!(descriptor.metric_type, MetricType::Int32);
    }

    #[test]
    fn snapshot_deserializes_camel_case() {
        let json = r#"{
            "counters": {"hits": 20},
            "timers": {"latency": [3, 1, 2]},
            "percentThresholds": [90, 99.5],
            "flushIntervalMs": 10000
        }"#;
        let snapshot: MetricSnapshot = serde_json::from_str(json).expect("valid snapshot json");

        assert_eq!(snapshot.counters["hits"], 20.0);
        assert!(snapshot.gauges.is_empty());
        assert_eq!(snapshot.timers["latency"], vec![3.0, 1.0, 2.0]);
        assert_eq!(snapshot.percent_thresholds, vec![90.0, 99.5]);
        assert_eq!(snapshot.flush_interval_ms, 10_000);
    }

    #[test]
    fn override_parses_type_and_slope() {
        let over: MetricOverride =
            serde_json::from_str(r#"{"units": "ms", "slope": "positive", "type": "double"}"#)
                .expect("valid override json");

        assert_eq!(over.units.as_deref(), Some("ms"));
        assert_eq!(over.slope, Some(Slope::Positive));
        assert_eq!(over.metric_type, Some(MetricType::Double));
        assert!(over.group.is_none());
    }

    #[test]
    fn wire_names() {
        assert_eq!(Slope::Both.to_string(), "both");
        assert_eq!(Slope::Unspecified.code(), 4);
        assert_eq!(MetricType::Uint16.to_string(), "uint16");
        assert!(MetricType::Int32.is_integer());
        assert!(!MetricType::Double.is_integer());
    }
}
