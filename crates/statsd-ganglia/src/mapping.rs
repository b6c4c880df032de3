//! Descriptor mapping policies applied before export.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use api_types::MetricDescriptor;
use api_types::MetricOverride;
use error_stack::Report;

use crate::config::GangliaConfig;
use crate::config::TransformSpec;
use crate::error::ConfigError;
use crate::error::TransformError;

/// Rewrites the descriptor of every derived stat.
pub trait DescriptorTransform: Send + Sync {
    fn transform(&self, descriptor: MetricDescriptor) -> Result<MetricDescriptor, TransformError>;
}

impl<F> DescriptorTransform for F
where
    F: Fn(MetricDescriptor) -> Result<MetricDescriptor, TransformError> + Send + Sync,
{
    fn transform(&self, descriptor: MetricDescriptor) -> Result<MetricDescriptor, TransformError> {
        self(descriptor)
    }
}

/// How derived stat names map onto gmond descriptors
#[derive(Clone)]
pub enum MetricMappingPolicy {
    /// Overrides keyed by derived stat name
    PerName(HashMap<String, MetricOverride>),
    /// One transform applied to every descriptor
    CatchAll(Arc<dyn DescriptorTransform>),
}

impl fmt::Debug for MetricMappingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricMappingPolicy::PerName(map) => f.debug_tuple("PerName").field(map).finish(),
            MetricMappingPolicy::CatchAll(_) => f.write_str("CatchAll(..)"),
        }
    }
}

impl MetricMappingPolicy {
    pub fn catch_all(transform: impl DescriptorTransform + 'static) -> Self {
        MetricMappingPolicy::CatchAll(Arc::new(transform))
    }

    /// Resolve the configured policy. A `metricTransform` takes precedence
    /// over a `metricMap` when both are present.
    pub fn from_config(
        ganglia: &GangliaConfig,
        registry: &TransformRegistry,
    ) -> Result<Option<Self>, Report<ConfigError>> {
        if let Some(spec) = &ganglia.metric_transform {
            if ganglia.metric_map.is_some() {
                tracing::warn!(
                    method = %spec.method,
                    "both metricTransform and metricMap configured, metricMap is ignored"
                );
            }
            return registry.resolve(spec).map(|t| Some(MetricMappingPolicy::CatchAll(t)));
        }
        Ok(ganglia.metric_map.clone().map(MetricMappingPolicy::PerName))
    }

    /// Build the final descriptor for a stat starting from its defaults.
    pub fn describe(&self, defaults: MetricDescriptor) -> Result<MetricDescriptor, TransformError> {
        match self {
            MetricMappingPolicy::CatchAll(transform) => {
                let descriptor = transform.transform(defaults)?;
                validate(&descriptor)?;
                Ok(descriptor)
            }
            MetricMappingPolicy::PerName(map) => {
                let mut descriptor = defaults;
                if let Some(over) = map.get(&descriptor.name) {
                    descriptor.apply(over);
                }
                Ok(descriptor)
            }
        }
    }
}

fn validate(descriptor: &MetricDescriptor) -> Result<(), TransformError> {
    if descriptor.name.is_empty() {
        return Err(TransformError::Malformed {
            reason: "empty metric name".to_string(),
        });
    }
    if descriptor.group.is_empty() {
        return Err(TransformError::Malformed {
            reason: format!("empty group for metric {}", descriptor.name),
        });
    }
    Ok(())
}

type TransformFactory = fn(&str) -> Arc<dyn DescriptorTransform>;

fn from_fn<F>(f: F) -> Arc<dyn DescriptorTransform>
where
    F: Fn(MetricDescriptor) -> Result<MetricDescriptor, TransformError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Named transforms a config file may select with `metricTransform`.
pub struct TransformRegistry {
    factories: HashMap<String, TransformFactory>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding `strip_prefix` and `group_by_kind`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("strip_prefix", strip_prefix);
        registry.register("group_by_kind", group_by_kind);
        registry
    }

    pub fn register(&mut self, method: &str, factory: TransformFactory) {
        self.factories.insert(method.to_string(), factory);
    }

    pub fn resolve(
        &self,
        spec: &TransformSpec,
    ) -> Result<Arc<dyn DescriptorTransform>, Report<ConfigError>> {
        let factory = self.factories.get(&spec.method).ok_or_else(|| {
            Report::new(ConfigError::UnknownTransform {
                method: spec.method.clone(),
            })
        })?;
        Ok(factory(&spec.source))
    }
}

/// Drops `source` from the front of the display name.
fn strip_prefix(source: &str) -> Arc<dyn DescriptorTransform> {
    let prefix = source.to_string();
    from_fn(move |mut descriptor| {
        if let Some(rest) = descriptor.name.strip_prefix(&prefix) {
            descriptor.name = rest.to_string();
        }
        Ok(descriptor)
    })
}

/// Splits stats into `<group> counts`, `<group> gauges`, `<group> timers`
/// and `<group> rates`; `source`, when set, replaces the base group.
fn group_by_kind(source: &str) -> Arc<dyn DescriptorTransform> {
    let base = (!source.is_empty()).then(|| source.to_string());
    from_fn(move |mut descriptor| {
        let kind = if descriptor.name.starts_with("stats_counts_") {
            "counts"
        } else if descriptor.name.starts_with("stats_gauges_") {
            "gauges"
        } else if descriptor.name.starts_with("stats_timers_") {
            "timers"
        } else if descriptor.name.starts_with("stats_") {
            "rates"
        } else {
            return Ok(descriptor);
        };
        let group = base.as_deref().unwrap_or(&descriptor.group);
        descriptor.group = format!("{group} {kind}");
        Ok(descriptor)
    })
}

#[cfg(test)]
mod tests {
    use api_types::MetricType;
    use api_types::Slope;
    use similar_asserts::assert_eq;

    use super::*;

    fn defaults(name: &str) -> MetricDescriptor {
        MetricDescriptor::with_defaults(name, "StatsD")
    }

    #[test]
    fn per_name_overlays_only_set_fields() {
        let policy = MetricMappingPolicy::PerName(HashMap::from([(
            "stats_hits".to_string(),
            MetricOverride {
                group: Some("web".to_string()),
                ..Default::default()
            },
        )]));

        let descriptor = policy.describe(defaults("stats_hits")).expect("no error");
        assert_eq!(descriptor, {
            let mut expected = defaults("stats_hits");
            expected.group = "web".to_string();
            expected
        });

        let untouched = policy.describe(defaults("stats_misses")).expect("no error");
        assert_eq!(untouched, defaults("stats_misses"));
    }

    #[test]
    fn catch_all_result_is_used_verbatim() {
        let policy = MetricMappingPolicy::catch_all(
            |d: MetricDescriptor| -> Result<MetricDescriptor, TransformError> {
                Ok(MetricDescriptor {
                    name: d.name.to_uppercase(),
                    group: "all".to_string(),
                    units: "ms".to_string(),
                    slope: Slope::Positive,
                    metric_type: MetricType::Double,
                })
            },
        );

        let descriptor = policy.describe(defaults("stats_hits")).expect("no error");
        assert_eq!(descriptor.name, "STATS_HITS");
        assert_eq!(descriptor.group, "all");
        assert_eq!(descriptor.units, "ms");
        assert_eq!(descriptor.slope, Slope::Positive);
        assert_eq!(descriptor.metric_type, MetricType::Double);
    }

    #[test]
    fn catch_all_malformed_descriptor_is_an_error() {
        let policy = MetricMappingPolicy::catch_all(
            |mut d: MetricDescriptor| -> Result<MetricDescriptor, TransformError> {
                d.group.clear();
                Ok(d)
            },
        );

        let err = policy
            .describe(defaults("stats_hits"))
            .expect_err("empty group is malformed");
        assert!(matches!(err, TransformError::Malformed { .. }));
    }

    #[test]
    fn transform_wins_over_metric_map() {
        let ganglia = GangliaConfig {
            metric_map: Some(HashMap::from([(
                "stats_hits".to_string(),
                MetricOverride {
                    group: Some("web".to_string()),
                    ..Default::default()
                },
            )])),
            metric_transform: Some(TransformSpec {
                method: "strip_prefix".to_string(),
                source: "stats_".to_string(),
            }),
            ..Default::default()
        };

        let policy = MetricMappingPolicy::from_config(&ganglia, &TransformRegistry::default())
            .expect("resolves")
            .expect("policy configured");
        assert!(matches!(policy, MetricMappingPolicy::CatchAll(_)));

        let descriptor = policy.describe(defaults("stats_hits")).expect("no error");
        assert_eq!(descriptor.name, "hits");
        assert_eq!(descriptor.group, "StatsD");
    }

    #[test]
    fn no_mapping_configured() {
        let policy =
            MetricMappingPolicy::from_config(&GangliaConfig::default(), &TransformRegistry::default())
                .expect("resolves");
        assert!(policy.is_none());
    }

    #[test]
    fn unknown_transform_is_rejected() {
        let ganglia = GangliaConfig {
            metric_transform: Some(TransformSpec {
                method: "from_js".to_string(),
                source: "./map.js".to_string(),
            }),
            ..Default::default()
        };

        let err = MetricMappingPolicy::from_config(&ganglia, &TransformRegistry::default())
            .expect_err("unknown method");
        assert!(matches!(
            err.current_context(),
            ConfigError::UnknownTransform { method } if method == "from_js"
        ));
    }

    #[test]
    fn group_by_kind_splits_groups() {
        let registry = TransformRegistry::with_builtins();
        let transform = registry
            .resolve(&TransformSpec {
                method: "group_by_kind".to_string(),
                source: String::new(),
            })
            .expect("builtin");

        let group = |name: &str| transform.transform(defaults(name)).expect("no error").group;
        assert_eq!(group("stats_counts_hits"), "StatsD counts");
        assert_eq!(group("stats_gauges_depth"), "StatsD gauges");
        assert_eq!(group("stats_timers_db_upper"), "StatsD timers");
        assert_eq!(group("stats_hits"), "StatsD rates");
        assert_eq!(group("statsd_numStats"), "StatsD");
    }
}
