//! Flush cycle: snapshot the store, reduce, export.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::exporter::ExportSummary;
use crate::exporter::Exporter;
use crate::reducer;
use crate::store::MetricStore;

/// Values fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq)]
pub struct FlushSettings {
    pub flush_interval_ms: u64,
    pub percent_thresholds: Vec<f64>,
}

/// Run one flush cycle to completion.
pub fn flush_once(
    store: &Mutex<MetricStore>,
    exporter: &Exporter,
    settings: &FlushSettings,
) -> ExportSummary {
    // the lock only covers the swap, reduction runs outside it
    let snapshot = store
        .lock()
        .expect("poisoned")
        .take_snapshot(&settings.percent_thresholds, settings.flush_interval_ms);
    let stats = reducer::reduce(&snapshot);
    let summary = exporter.export(&stats);
    tracing::debug!(
        stats = stats.len(),
        sent = summary.sent,
        skipped = summary.skipped,
        failed = summary.failed,
        "flush completed"
    );
    summary
}

/// Flush on every interval tick until `token` is cancelled.
pub async fn run_flush_loop(
    store: Arc<Mutex<MetricStore>>,
    exporter: Arc<Exporter>,
    settings: FlushSettings,
    token: CancellationToken,
) {
    let period = Duration::from_millis(settings.flush_interval_ms);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    // a late cycle must not be followed by a burst of catch-up flushes
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("Flush loop cancelled");
                break;
            }
            _ = interval.tick() => {
                flush_once(&store, &exporter, &settings);
            }
        }
    }
}
