use std::sync::Mutex;

use api_types::SinkRecord;

use super::MetricSink;
use crate::error::SendError;

/// A record captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentRecord {
    pub host: String,
    pub port: u16,
    pub record: SinkRecord,
}

type FailWhen = Box<dyn Fn(&SinkRecord) -> bool + Send + Sync>;

/// Keeps every record in memory instead of sending it; used by tests and
/// the `flush` dry run.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentRecord>>,
    fail_when: Option<FailWhen>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every record matching `predicate`.
    pub fn failing_when(predicate: impl Fn(&SinkRecord) -> bool + Send + Sync + 'static) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_when: Some(Box::new(predicate)),
        }
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().expect("poisoned").clone()
    }
}

impl MetricSink for RecordingSink {
    fn send(&self, host: &str, port: u16, record: &SinkRecord) -> Result<(), SendError> {
        if self.fail_when.as_ref().is_some_and(|fail| fail(record)) {
            return Err(SendError::Io {
                addr: ([127, 0, 0, 1], port).into(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "rejected"),
            });
        }
        self.sent.lock().expect("poisoned").push(SentRecord {
            host: host.to_string(),
            port,
            record: record.clone(),
        });
        Ok(())
    }
}
