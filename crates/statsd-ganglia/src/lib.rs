pub mod app;
pub mod config;
pub mod error;
pub mod exporter;
pub mod flush;
pub mod ingest;
pub mod listener;
pub mod logging;
pub mod mapping;
pub mod mgmt;
pub mod reducer;
pub mod sink;
pub mod status;
pub mod store;

pub use api_types::DerivedStats;
pub use api_types::MetricSnapshot;
