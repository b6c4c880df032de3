pub mod backend;
pub mod cli;

/// Exporter settings resolved once at startup from the `ganglia` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// gmond host; `None` disables all sends.
    pub host: Option<String>,
    pub port: u16,
    pub spoof: Option<String>,
    /// Hostname presented to gmond when no spoof identity is set.
    pub hostname: String,
    /// Group used when no mapping sets one.
    pub default_group: String,
}

impl ExporterConfig {
    /// Identity placed in each record's hostname field.
    pub fn identity(&self) -> &str {
        self.spoof.as_deref().unwrap_or(&self.hostname)
    }
}

impl From<&backend::GangliaConfig> for ExporterConfig {
    fn from(ganglia: &backend::GangliaConfig) -> Self {
        let hostname = ganglia
            .use_host
            .clone()
            .or_else(utils::hostname::hostname)
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            host: ganglia.host.clone().filter(|host| !host.is_empty()),
            port: ganglia.port,
            spoof: ganglia.spoof.clone(),
            hostname,
            default_group: ganglia.group.clone(),
        }
    }
}

pub use backend::*;
pub use cli::*;

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn identity_prefers_spoof() {
        let ganglia = GangliaConfig {
            host: Some("gmond".to_string()),
            spoof: Some("10.0.0.1:web01".to_string()),
            use_host: Some("statsd01".to_string()),
            ..Default::default()
        };
        let config = ExporterConfig::from(&ganglia);
        assert_eq!(config.identity(), "10.0.0.1:web01");
        assert_eq!(config.hostname, "statsd01");
    }

    #[test]
    fn empty_host_disables_export() {
        let ganglia = GangliaConfig {
            host: Some(String::new()),
            use_host: Some("statsd01".to_string()),
            ..Default::default()
        };
        let config = ExporterConfig::from(&ganglia);
        assert!(config.host.is_none());
        assert_eq!(config.identity(), "statsd01");
        assert_eq!(config.default_group, "StatsD");
    }
}
