use std::sync::Arc;
use std::sync::Mutex;

use crate::exporter::Exporter;
use crate::flush::FlushSettings;
use crate::mgmt::ManagementServer;
use crate::store::MetricStore;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub store: Arc<Mutex<MetricStore>>,
    pub exporter: Arc<Exporter>,
    pub management: Arc<ManagementServer>,
    pub flush_settings: FlushSettings,
}
