//! Configuration for format resolution and metric encoding.

use crate::error::ConfigError;

/// Display name of the grid format preferred when several grid formats claim a file.
pub const DEFAULT_PREFERRED_GRID_FORMAT: &str = "GeoTIFF";

/// Environment variable enabling per-instance metric tags.
pub const PER_INSTANCE_METRICS_ENV: &str = "GEOIMPORT_PER_INSTANCE_METRICS";

/// Environment variable overriding the probed instance identifier.
pub const INSTANCE_ID_ENV: &str = "GEOIMPORT_INSTANCE_ID";

/// Environment variable naming the auto-scaling group.
pub const AUTO_SCALING_GROUP_ENV: &str = "GEOIMPORT_AUTO_SCALING_GROUP";

/// Options controlling [`crate::resolver::FormatResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Grid format display name that wins when several grid formats claim a file.
    pub preferred_grid_format: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            preferred_grid_format: DEFAULT_PREFERRED_GRID_FORMAT.to_string(),
        }
    }
}

/// Options controlling [`crate::metrics::MetricEncoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Probe the hosting environment for instance id and type tags.
    pub per_instance_metrics: bool,
    /// Instance identifier; when set it wins over the probed one.
    pub instance_id: Option<String>,
    /// Auto-scaling group name tag.
    pub auto_scaling_group: Option<String>,
}

impl MetricsConfig {
    /// Reads the configuration from `GEOIMPORT_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if
    /// `GEOIMPORT_PER_INSTANCE_METRICS` is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if the per-instance flag is not a boolean.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let per_instance_metrics = match lookup(PER_INSTANCE_METRICS_ENV) {
            Some(raw) => parse_bool(PER_INSTANCE_METRICS_ENV, &raw)?,
            None => false,
        };

        Ok(Self {
            per_instance_metrics,
            instance_id: lookup(INSTANCE_ID_ENV).filter(|v| !v.trim().is_empty()),
            auto_scaling_group: lookup(AUTO_SCALING_GROUP_ENV).filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse_bool(option: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidOption {
            option: option.to_string(),
            message: format!("expected a boolean, found '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ResolverConfig::default().preferred_grid_format, "GeoTIFF");
        let config = MetricsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MetricsConfig::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = MetricsConfig::from_lookup(lookup(&[
            (PER_INSTANCE_METRICS_ENV, "Yes"),
            (INSTANCE_ID_ENV, "i-0abc"),
            (AUTO_SCALING_GROUP_ENV, "importers"),
        ]))
        .unwrap();
        assert!(config.per_instance_metrics);
        assert_eq!(config.instance_id.as_deref(), Some("i-0abc"));
        assert_eq!(config.auto_scaling_group.as_deref(), Some("importers"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = MetricsConfig::from_lookup(lookup(&[(INSTANCE_ID_ENV, "  ")])).unwrap();
        assert!(config.instance_id.is_none());
    }

    #[test]
    fn test_invalid_boolean() {
        let err = MetricsConfig::from_lookup(lookup(&[(PER_INSTANCE_METRICS_ENV, "sometimes")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid GEOIMPORT_PER_INSTANCE_METRICS option: expected a boolean, found 'sometimes'"
        );
    }
}
