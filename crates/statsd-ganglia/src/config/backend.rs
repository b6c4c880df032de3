use std::collections::HashMap;
use std::path::Path;

use api_types::MetricOverride;
use error_stack::Report;
use error_stack::ResultExt;
use serde::Deserialize;
use serde::Deserializer;

use crate::error::ConfigError;

pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_GANGLIA_PORT: u16 = 8649;
pub const DEFAULT_GANGLIA_GROUP: &str = "StatsD";

/// statsd-style configuration file, JSON or YAML
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsdConfig {
    /// Flush interval in milliseconds
    pub flush_interval: u64,
    pub debug: bool,
    #[serde(deserialize_with = "deserialize_thresholds")]
    pub percent_threshold: Vec<f64>,
    pub ganglia: GangliaConfig,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL_MS,
            debug: false,
            percent_threshold: vec![90.0],
            ganglia: GangliaConfig::default(),
        }
    }
}

/// The `ganglia` section of the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GangliaConfig {
    /// gmond host; exporting is disabled when absent
    pub host: Option<String>,
    pub port: u16,
    /// Spoof string, e.g. `"10.0.0.1:web01"`
    pub spoof: Option<String>,
    /// Hostname presented to gmond when not spoofing
    pub use_host: Option<String>,
    pub group: String,
    /// Per-name descriptor overrides
    pub metric_map: Option<HashMap<String, MetricOverride>>,
    /// Catch-all descriptor transform, resolved by name at startup
    pub metric_transform: Option<TransformSpec>,
}

impl Default for GangliaConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_GANGLIA_PORT,
            spoof: None,
            use_host: None,
            group: DEFAULT_GANGLIA_GROUP.to_string(),
            metric_map: None,
            metric_transform: None,
        }
    }
}

/// Names a built-in transform and its argument
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransformSpec {
    pub method: String,
    #[serde(default)]
    pub source: String,
}

/// Accepts either a single threshold or a list of them
fn deserialize_thresholds<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(f64),
        Many(Vec<f64>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pct) => Ok(vec![pct]),
        OneOrMany::Many(pcts) => Ok(pcts),
    }
}

impl StatsdConfig {
    /// Load and validate a config file. `.yaml`/`.yml` files are parsed as
    /// YAML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, Report<ConfigError>> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).change_context(ConfigError::Read {
            path: display.clone(),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        let config: StatsdConfig = if is_yaml {
            serde_yaml::from_str(&raw).change_context(ConfigError::Parse { path: display })?
        } else {
            serde_json::from_str(&raw).change_context(ConfigError::Parse { path: display })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise start from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Report<ConfigError>> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), Report<ConfigError>> {
        if self.flush_interval == 0 {
            return Err(Report::new(ConfigError::Invalid {
                message: "flushInterval must be greater than zero".to_string(),
            }));
        }
        if let Some(pct) = self
            .percent_threshold
            .iter()
            .find(|pct| !(**pct > 0.0 && **pct <= 100.0))
        {
            return Err(Report::new(ConfigError::Invalid {
                message: format!("percentThreshold {pct} is outside (0, 100]"),
            }));
        }
        Ok(())
    }
}
