//! provides logging helpers

use std::fmt::{self};
use std::path::Path;

use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterExt;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::format;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::Registry;

/// Writes `<unix seconds> <msg>` for every exported record
struct MetricsLineFormatter;

struct FieldVisitor {
    msg: String,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, _: &Field, value: &str) {
        self.msg.push_str(value);
    }

    fn record_debug(&mut self, _: &Field, value: &dyn fmt::Debug) {
        self.msg.push_str(&format!("{value:?}"));
    }
}

impl<S, N> FormatEvent<S, N> for MetricsLineFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor { msg: String::new() };
        event.record(&mut visitor);

        writeln!(writer, "{} {}", chrono::Utc::now().timestamp(), visitor.msg)
    }
}

/// initiate the global tracing subscriber
///
/// When `metrics_file` is set every exported record is also appended to a
/// daily rotated file; keep the returned guard alive to flush it.
pub fn init(debug: bool, metrics_file: Option<&Path>) -> Option<WorkerGuard> {
    let fmt_layer = utils::logging::get_fmt_layer::<Registry>().with_filter(
        utils::logging::env_filter(debug)
            .and(filter::filter_fn(|metadata| metadata.target() != "metrics")),
    );

    let (metrics_layer, guard) = match metrics_file.and_then(metrics_appender) {
        Some(appender) => {
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let metrics_layer = layer()
                .event_format(MetricsLineFormatter)
                .fmt_fields(format::DefaultFields::new())
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(filter::filter_fn(|metadata| metadata.target() == "metrics"));
            (Some(metrics_layer), Some(file_guard))
        }
        None => (None, None),
    };

    registry().with(fmt_layer).with(metrics_layer).init();
    guard
}

fn metrics_appender(metrics_file: &Path) -> Option<RollingFileAppender> {
    let dir = metrics_file.parent().filter(|p| !p.as_os_str().is_empty());
    let prefix = metrics_file.file_name()?.to_str()?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(3)
        .build(dir.unwrap_or(Path::new(".")))
        .inspect_err(|e| eprintln!("failed to create metrics file appender: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appender_needs_a_file_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("metrics.log");
        assert!(metrics_appender(&file).is_some());
        assert!(metrics_appender(Path::new("/")).is_none());
    }
}
