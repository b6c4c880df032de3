use std::collections::HashMap;

use api_types::MetricSnapshot;

use crate::ingest;
use crate::ingest::Metric;
use crate::ingest::Sample;

pub const BAD_LINES_KEY: &str = "statsd.bad_lines_seen";
pub const PACKETS_RECEIVED_KEY: &str = "statsd.packets_received";

/// Raw accumulators between two flushes.
///
/// Taking a snapshot resets counters to zero and empties timers while
/// keeping their keys, so idle metrics keep being reported. Gauges keep
/// their last value.
#[derive(Debug, Default)]
pub struct MetricStore {
    counters: HashMap<String, f64>,
    gauges: HashMap<String, f64>,
    timers: HashMap<String, Vec<f64>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metric: Metric) {
        match metric.sample {
            Sample::Counter(value) => *self.counters.entry(metric.key).or_default() += value,
            Sample::Gauge { value, delta: true } => {
                *self.gauges.entry(metric.key).or_default() += value
            }
            Sample::Gauge {
                value,
                delta: false,
            } => {
                self.gauges.insert(metric.key, value);
            }
            Sample::Timer(value) => self.timers.entry(metric.key).or_default().push(value),
        }
    }

    /// Record every line of a statsd packet; returns the number of lines
    /// rejected.
    pub fn ingest_packet(&mut self, packet: &str) -> usize {
        *self
            .counters
            .entry(PACKETS_RECEIVED_KEY.to_string())
            .or_default() += 1.0;

        let mut bad_lines = 0;
        for line in ingest::parse_packet(packet) {
            match line {
                Ok(metrics) => metrics.into_iter().for_each(|m| self.record(m)),
                Err(e) => {
                    tracing::debug!(error = %e, "bad line");
                    bad_lines += 1;
                }
            }
        }
        if bad_lines > 0 {
            *self.counters.entry(BAD_LINES_KEY.to_string()).or_default() += bad_lines as f64;
        }
        bad_lines
    }

    /// Hand out everything accumulated since the last flush and reset.
    pub fn take_snapshot(&mut self, percent_thresholds: &[f64], flush_interval_ms: u64) -> MetricSnapshot {
        let counters = self
            .counters
            .iter_mut()
            .map(|(key, value)| (key.clone(), std::mem::take(value)))
            .collect();
        let timers = self
            .timers
            .iter_mut()
            .map(|(key, samples)| (key.clone(), std::mem::take(samples)))
            .collect();

        MetricSnapshot {
            counters,
            gauges: self.gauges.clone(),
            timers,
            percent_thresholds: percent_thresholds.to_vec(),
            flush_interval_ms,
        }
    }
}
