//! Delivery of exported records to gmond.

use api_types::SinkRecord;

use crate::error::SendError;

pub mod gmetric;
pub mod memory;
pub mod udp;

/// Hands one record to the monitoring daemon at `host:port`.
///
/// Implementations send without waiting for an acknowledgement; a returned
/// error is counted by the exporter and never retried.
pub trait MetricSink: Send + Sync {
    fn send(&self, host: &str, port: u16, record: &SinkRecord) -> Result<(), SendError>;
}

impl<T: MetricSink + ?Sized> MetricSink for std::sync::Arc<T> {
    fn send(&self, host: &str, port: u16, record: &SinkRecord) -> Result<(), SendError> {
        (**self).send(host, port, record)
    }
}
