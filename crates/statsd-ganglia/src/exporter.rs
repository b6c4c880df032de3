//! Sends derived stats to gmond, one record per stat.

use std::sync::Arc;

use api_types::DerivedStats;
use api_types::MetricDescriptor;
use api_types::SinkRecord;

use crate::config::ExporterConfig;
use crate::mapping::MetricMappingPolicy;
use crate::sink::MetricSink;
use crate::status::ExportStatus;

/// Source of "now" in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// Wall clock, rounded to the nearest second.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        (chrono::Utc::now().timestamp_millis() as f64 / 1000.0).round() as i64
    }
}

/// Counts from one [`Exporter::export`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Exporter {
    config: ExporterConfig,
    policy: Option<MetricMappingPolicy>,
    sink: Box<dyn MetricSink>,
    clock: Box<dyn Clock>,
    status: Arc<ExportStatus>,
}

impl Exporter {
    /// Create an exporter whose status starts at the clock's current time.
    pub fn new(
        config: ExporterConfig,
        policy: Option<MetricMappingPolicy>,
        sink: Box<dyn MetricSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let status = Arc::new(ExportStatus::new(clock.now_secs()));
        Self {
            config,
            policy,
            sink,
            clock,
            status,
        }
    }

    /// Shared handle for status queries.
    pub fn status(&self) -> Arc<ExportStatus> {
        self.status.clone()
    }

    /// Send every stat. Failures are recorded in the status and never stop
    /// the remaining stats from being sent.
    pub fn export(&self, stats: &DerivedStats) -> ExportSummary {
        let mut summary = ExportSummary::default();
        let Some(host) = self.config.host.as_deref() else {
            return summary;
        };

        for (key, value) in stats {
            tracing::debug!("gmetric.send {key} {value}");

            let defaults = MetricDescriptor::with_defaults(key.as_str(), &self.config.default_group);
            let descriptor = match &self.policy {
                Some(policy) => match policy.describe(defaults) {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        tracing::debug!(metric = %key, error = %e, "metric transform failed");
                        self.status.record_exception(self.clock.now_secs());
                        summary.failed += 1;
                        continue;
                    }
                },
                None => defaults,
            };

            if !value.is_finite() {
                tracing::debug!(metric = %key, value = %value, "skipping non-finite value");
                summary.skipped += 1;
                continue;
            }

            let record = SinkRecord::new(
                self.config.identity().to_string(),
                self.config.spoof.is_some(),
                descriptor,
                *value,
            );
            match self.sink.send(host, self.config.port, &record) {
                Ok(()) => {
                    let line = format!(
                        "{} {} {} {}",
                        record.name, record.value, record.group, record.hostname
                    );
                    tracing::info!(target: "metrics", msg = %line);
                    self.status.record_flush(self.clock.now_secs());
                    summary.sent += 1;
                }
                Err(e) => {
                    tracing::debug!(metric = %key, error = %e, "gmetric send failed");
                    self.status.record_exception(self.clock.now_secs());
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
