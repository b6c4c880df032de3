//! Flush-time reduction of raw statsd accumulators into derived stats.
//!
//! [`reduce`] is pure: it reads a [`MetricSnapshot`] and returns the flat
//! name → value map that the exporter sends, one entry per derived stat.

use api_types::DerivedStats;
use api_types::MetricSnapshot;

/// Name of the stat counting the raw keys processed in a flush.
pub const NUM_STATS_KEY: &str = "statsd_numStats";

/// Reduce one flush worth of raw metrics.
///
/// Counters yield a per-second rate and the raw count, gauges are passed
/// through, timers yield `count`/`lower`/`upper` plus a trimmed mean and
/// upper bound per percentile threshold. Timers without samples yield the
/// same names with zero placeholders so gmond keeps the metric alive.
pub fn reduce(snapshot: &MetricSnapshot) -> DerivedStats {
    let mut stats = DerivedStats::new();
    let mut num_stats = 0usize;

    let interval_secs = snapshot.flush_interval_ms as f64 / 1000.0;
    for (key, value) in &snapshot.counters {
        stats.insert(format!("stats_{key}"), value / interval_secs);
        stats.insert(format!("stats_counts_{key}"), *value);
        num_stats += 1;
    }

    let labels: Vec<String> = snapshot
        .percent_thresholds
        .iter()
        .map(|pct| threshold_label(*pct))
        .collect();
    for (key, samples) in &snapshot.timers {
        TimerSummary::from_samples(samples, &snapshot.percent_thresholds)
            .write_into(&mut stats, key, &labels);
        num_stats += 1;
    }

    for (key, value) in &snapshot.gauges {
        stats.insert(format!("stats_gauges_{key}"), *value);
        num_stats += 1;
    }

    stats.insert(NUM_STATS_KEY.to_string(), num_stats as f64);
    stats
}

/// Render a threshold for use inside a metric name: `90` → `"90"`,
/// `99.5` → `"99_5"`.
pub fn threshold_label(pct: f64) -> String {
    pct.to_string().replace('.', "_")
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PercentileStat {
    mean: f64,
    upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct TimerSummary {
    count: usize,
    lower: f64,
    upper: f64,
    /// One entry per configured threshold, same order
    percentiles: Vec<PercentileStat>,
}

impl TimerSummary {
    fn from_samples(samples: &[f64], thresholds: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::placeholder(thresholds.len());
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let lower = sorted[0];
        let upper = sorted[count - 1];

        let percentiles = thresholds
            .iter()
            .map(|pct| {
                // a single sample has no meaningful percentile
                if count <= 1 {
                    return PercentileStat { mean: lower, upper };
                }
                let window = &sorted[..num_in_threshold(count, *pct)];
                PercentileStat {
                    mean: window.iter().sum::<f64>() / window.len() as f64,
                    upper: window[window.len() - 1],
                }
            })
            .collect();

        Self {
            count,
            lower,
            upper,
            percentiles,
        }
    }

    fn placeholder(thresholds: usize) -> Self {
        Self {
            count: 0,
            lower: 0.0,
            upper: 0.0,
            percentiles: vec![
                PercentileStat {
                    mean: 0.0,
                    upper: 0.0,
                };
                thresholds
            ],
        }
    }

    fn write_into(&self, stats: &mut DerivedStats, key: &str, labels: &[String]) {
        for (label, pct) in labels.iter().zip(&self.percentiles) {
            stats.insert(format!("stats_timers_{key}_mean_{label}"), pct.mean);
            stats.insert(format!("stats_timers_{key}_upper_{label}"), pct.upper);
        }
        stats.insert(format!("stats_timers_{key}_upper"), self.upper);
        stats.insert(format!("stats_timers_{key}_lower"), self.lower);
        stats.insert(format!("stats_timers_{key}_count"), self.count as f64);
    }
}

/// Number of smallest samples kept for threshold `pct`. At least one sample
/// is always kept so the window is never empty.
fn num_in_threshold(count: usize, pct: f64) -> usize {
    let threshold_index = ((100.0 - pct) / 100.0 * count as f64).round() as usize;
    count.saturating_sub(threshold_index).clamp(1, count)
}
