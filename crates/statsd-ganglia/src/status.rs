use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

/// Namespace under which backend status fields are reported.
pub const STATUS_NAMESPACE: &str = "ganglia";

/// Last successful send and last failure, in seconds since the Unix epoch.
///
/// Written only by the exporter; readers get a live view through
/// [`ExportStatus::snapshot`] or [`ExportStatus::report`].
#[derive(Debug)]
pub struct ExportStatus {
    last_flush: AtomicI64,
    last_exception: AtomicI64,
}

/// Point-in-time copy of [`ExportStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub last_flush: i64,
    pub last_exception: i64,
}

impl ExportStatus {
    /// Both timestamps start at process startup time.
    pub fn new(startup_time: i64) -> Self {
        Self {
            last_flush: AtomicI64::new(startup_time),
            last_exception: AtomicI64::new(startup_time),
        }
    }

    pub(crate) fn record_flush(&self, now: i64) {
        self.last_flush.store(now, Ordering::Relaxed);
    }

    pub(crate) fn record_exception(&self, now: i64) {
        self.last_exception.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            last_flush: self.last_flush.load(Ordering::Relaxed),
            last_exception: self.last_exception.load(Ordering::Relaxed),
        }
    }

    /// Yield every field as a `(namespace, field, value)` triple.
    pub fn report(&self, mut write: impl FnMut(&str, &str, i64)) {
        let snapshot = self.snapshot();
        write(STATUS_NAMESPACE, "last_flush", snapshot.last_flush);
        write(STATUS_NAMESPACE, "last_exception", snapshot.last_exception);
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn starts_at_startup_time() {
        let status = ExportStatus::new(1_700_000_000);
        assert_eq!(
            status.snapshot(),
            StatusSnapshot {
                last_flush: 1_700_000_000,
                last_exception: 1_700_000_000,
            }
        );
    }

    #[test]
    fn report_yields_each_field() {
        let status = ExportStatus::new(10);
        status.record_flush(20);
        status.record_exception(30);

        let mut seen = Vec::new();
        status.report(|namespace, field, value| {
            seen.push((namespace.to_string(), field.to_string(), value));
        });

        assert_eq!(
            seen,
            vec![
                ("ganglia".to_string(), "last_flush".to_string(), 20),
                ("ganglia".to_string(), "last_exception".to_string(), 30),
            ]
        );
    }
}
