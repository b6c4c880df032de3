use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use error_stack::Report;

use crate::app::Application;
use crate::app::ApplicationServices;
use crate::config::DaemonArgs;
use crate::config::ExporterConfig;
use crate::config::StatsdConfig;
use crate::error::ConfigError;
use crate::exporter::Exporter;
use crate::exporter::SystemClock;
use crate::flush::FlushSettings;
use crate::mapping::MetricMappingPolicy;
use crate::mapping::TransformRegistry;
use crate::mgmt::ManagementServer;
use crate::sink::udp::UdpSink;
use crate::sink::MetricSink;
use crate::store::MetricStore;

/// Create the exporter described by `config`, sending through `sink`.
pub fn build_exporter(
    config: &StatsdConfig,
    sink: Box<dyn MetricSink>,
) -> Result<Exporter, Report<ConfigError>> {
    let policy = MetricMappingPolicy::from_config(&config.ganglia, &TransformRegistry::default())?;
    let exporter_config = ExporterConfig::from(&config.ganglia);
    if exporter_config.host.is_none() {
        tracing::warn!("ganglia.host is not configured, metrics will not be exported");
    }
    Ok(Exporter::new(
        exporter_config,
        policy,
        sink,
        Box::new(SystemClock),
    ))
}

/// Application builder
pub struct ApplicationBuilder {
    daemon_args: DaemonArgs,
    config: StatsdConfig,
}

impl ApplicationBuilder {
    pub fn new(daemon_args: DaemonArgs, config: StatsdConfig) -> Self {
        Self {
            daemon_args,
            config,
        }
    }

    /// Build complete application
    pub fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let sink = UdpSink::bind_for(self.config.ganglia.host.as_deref(), self.config.ganglia.port)
            .context("failed to bind gmetric socket")?;
        let exporter = build_exporter(&self.config, Box::new(sink))
            .map_err(|e| anyhow::anyhow!("Failed to create exporter: {e:?}"))?;
        let status = exporter.status();
        let startup_time = status.snapshot().last_flush;

        let services = ApplicationServices {
            store: Arc::new(Mutex::new(MetricStore::new())),
            exporter: Arc::new(exporter),
            management: Arc::new(ManagementServer::new(status, startup_time)),
            flush_settings: FlushSettings {
                flush_interval_ms: self.config.flush_interval,
                percent_thresholds: self.config.percent_threshold.clone(),
            },
        };

        Ok(Application::new(services, self.daemon_args))
    }
}
