//! Measurement encoding for external monitoring.
//!
//! A [`MetricEncoder`] packages a name, a value and a [`MetricUnit`] into a
//! timestamped [`Measurement`] tagged with the identity of the host. The host
//! identity is looked up through an [`InstanceProbe`] at most once per encoder,
//! on first use, and only when per-instance metrics are enabled. A failed
//! lookup is logged and never retried; the tags it would have filled stay blank.
//!
//! Measurements are handed to a [`MetricSink`]; delivering them anywhere is the
//! sink's business.
//!
//! # Examples
//!
//! ```
//! use geoimport_core::config::MetricsConfig;
//! use geoimport_core::metrics::{MetricEncoder, MetricUnit};
//!
//! let config = MetricsConfig {
//!     auto_scaling_group: Some("importers".to_string()),
//!     ..MetricsConfig::default()
//! };
//! let encoder = MetricEncoder::new(config);
//! let measurement = encoder.encode("RecordsTransformed", 42.0, MetricUnit::Count);
//!
//! assert_eq!(measurement.unit.as_str(), "Count");
//! assert_eq!(measurement.tags.len(), 1);
//! assert_eq!(measurement.tags[0].name, "AutoScalingGroupName");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::SystemTime;

use anyhow::Result;
use log::{error, info};

use crate::config::MetricsConfig;

/// Tag holding the instance identifier.
pub const INSTANCE_ID_TAG: &str = "InstanceID";

/// Tag holding the instance type.
pub const INSTANCE_TYPE_TAG: &str = "InstanceType";

/// Tag holding the auto-scaling group name.
pub const AUTO_SCALING_GROUP_TAG: &str = "AutoScalingGroupName";

/// Environment variable read by [`EnvironmentProbe`] for the instance identifier.
pub const HOST_INSTANCE_ID_ENV: &str = "GEOIMPORT_HOST_INSTANCE_ID";

/// Environment variable read by [`EnvironmentProbe`] for the instance type.
pub const HOST_INSTANCE_TYPE_ENV: &str = "GEOIMPORT_HOST_INSTANCE_TYPE";

/// Environment variable read by [`EnvironmentProbe`] for the machine image id.
pub const HOST_AMI_ID_ENV: &str = "GEOIMPORT_HOST_AMI_ID";

/// Unit of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricUnit {
    Seconds,
    Microseconds,
    Milliseconds,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
    Bits,
    Kilobits,
    Megabits,
    Gigabits,
    Terabits,
    Percent,
    Count,
    BytesPerSecond,
    KilobytesPerSecond,
    MegabytesPerSecond,
    GigabytesPerSecond,
    TerabytesPerSecond,
    BitsPerSecond,
    KilobitsPerSecond,
    MegabitsPerSecond,
    GigabitsPerSecond,
    TerabitsPerSecond,
    CountPerSecond,
    None,
}

impl MetricUnit {
    /// Every unit, in declaration order.
    pub const ALL: [MetricUnit; 27] = [
        MetricUnit::Seconds,
        MetricUnit::Microseconds,
        MetricUnit::Milliseconds,
        MetricUnit::Bytes,
        MetricUnit::Kilobytes,
        MetricUnit::Megabytes,
        MetricUnit::Gigabytes,
        MetricUnit::Terabytes,
        MetricUnit::Bits,
        MetricUnit::Kilobits,
        MetricUnit::Megabits,
        MetricUnit::Gigabits,
        MetricUnit::Terabits,
        MetricUnit::Percent,
        MetricUnit::Count,
        MetricUnit::BytesPerSecond,
        MetricUnit::KilobytesPerSecond,
        MetricUnit::MegabytesPerSecond,
        MetricUnit::GigabytesPerSecond,
        MetricUnit::TerabytesPerSecond,
        MetricUnit::BitsPerSecond,
        MetricUnit::KilobitsPerSecond,
        MetricUnit::MegabitsPerSecond,
        MetricUnit::GigabitsPerSecond,
        MetricUnit::TerabitsPerSecond,
        MetricUnit::CountPerSecond,
        MetricUnit::None,
    ];

    /// Returns the wire label of this unit (e.g. `"Bytes/Second"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Seconds => "Seconds",
            MetricUnit::Microseconds => "Microseconds",
            MetricUnit::Milliseconds => "Milliseconds",
            MetricUnit::Bytes => "Bytes",
            MetricUnit::Kilobytes => "Kilobytes",
            MetricUnit::Megabytes => "Megabytes",
            MetricUnit::Gigabytes => "Gigabytes",
            MetricUnit::Terabytes => "Terabytes",
            MetricUnit::Bits => "Bits",
            MetricUnit::Kilobits => "Kilobits",
            MetricUnit::Megabits => "Megabits",
            MetricUnit::Gigabits => "Gigabits",
            MetricUnit::Terabits => "Terabits",
            MetricUnit::Percent => "Percent",
            MetricUnit::Count => "Count",
            MetricUnit::BytesPerSecond => "Bytes/Second",
            MetricUnit::KilobytesPerSecond => "Kilobytes/Second",
            MetricUnit::MegabytesPerSecond => "Megabytes/Second",
            MetricUnit::GigabytesPerSecond => "Gigabytes/Second",
            MetricUnit::TerabytesPerSecond => "Terabytes/Second",
            MetricUnit::BitsPerSecond => "Bits/Second",
            MetricUnit::KilobitsPerSecond => "Kilobits/Second",
            MetricUnit::MegabitsPerSecond => "Megabits/Second",
            MetricUnit::GigabitsPerSecond => "Gigabits/Second",
            MetricUnit::TerabitsPerSecond => "Terabits/Second",
            MetricUnit::CountPerSecond => "Count/Second",
            MetricUnit::None => "None",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name/value tag attached to a measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: &'static str,
    pub value: String,
}

/// A single encoded measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    /// When the measurement was encoded.
    pub timestamp: SystemTime,
    pub tags: Vec<Tag>,
}

impl Measurement {
    /// Returns the value of the tag called `name`.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }
}

/// Identity of the host the process runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub ami_id: Option<String>,
}

/// Looks up the identity of the hosting environment.
pub trait InstanceProbe: Send + Sync + fmt::Debug {
    /// Returns the host identity.
    ///
    /// # Errors
    ///
    /// Returns an error when the identity cannot be determined, for example
    /// when the process does not run on a managed host.
    fn probe(&self) -> Result<InstanceIdentity>;
}

/// Reads the host identity from `GEOIMPORT_HOST_*` environment variables.
///
/// Each part is optional, so a configured instance id can be combined with a
/// probed instance type. The lookup fails only when none of the variables is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentProbe;

impl EnvironmentProbe {
    /// Reads the host identity through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when no `GEOIMPORT_HOST_*` variable is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<InstanceIdentity> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let identity = InstanceIdentity {
            instance_id: read(HOST_INSTANCE_ID_ENV),
            instance_type: read(HOST_INSTANCE_TYPE_ENV),
            ami_id: read(HOST_AMI_ID_ENV),
        };
        if identity == InstanceIdentity::default() {
            anyhow::bail!("no GEOIMPORT_HOST_* variable is set, is this a managed host?");
        }
        Ok(identity)
    }
}

impl InstanceProbe for EnvironmentProbe {
    fn probe(&self) -> Result<InstanceIdentity> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Encodes measurements with host tags.
#[derive(Debug)]
pub struct MetricEncoder {
    config: MetricsConfig,
    probe: Arc<dyn InstanceProbe>,
    identity: OnceLock<InstanceIdentity>,
}

impl MetricEncoder {
    /// Creates an encoder probing the host through [`EnvironmentProbe`].
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self::with_probe(config, Arc::new(EnvironmentProbe))
    }

    /// Creates an encoder with a custom probe.
    #[must_use]
    pub fn with_probe(config: MetricsConfig, probe: Arc<dyn InstanceProbe>) -> Self {
        Self {
            config,
            probe,
            identity: OnceLock::new(),
        }
    }

    /// The encoder configuration.
    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Encodes a measurement taken now.
    pub fn encode(&self, name: impl Into<String>, value: f64, unit: MetricUnit) -> Measurement {
        let identity = self.identity.get_or_init(|| self.set_up());

        let candidates = [
            (INSTANCE_ID_TAG, identity.instance_id.as_deref()),
            (INSTANCE_TYPE_TAG, identity.instance_type.as_deref()),
            (AUTO_SCALING_GROUP_TAG, self.config.auto_scaling_group.as_deref()),
        ];
        let tags = candidates
            .into_iter()
            .filter_map(|(name, value)| {
                value.filter(|v| !v.trim().is_empty()).map(|v| Tag {
                    name,
                    value: v.to_string(),
                })
            })
            .collect();

        Measurement {
            name: name.into(),
            value,
            unit,
            timestamp: SystemTime::now(),
            tags,
        }
    }

    fn set_up(&self) -> InstanceIdentity {
        let mut identity = InstanceIdentity::default();

        if self.config.per_instance_metrics {
            match self.probe.probe() {
                Ok(probed) => {
                    info!(
                        "Detected AMI id {}, instance type {}",
                        probed.ami_id.as_deref().unwrap_or("-"),
                        probed.instance_type.as_deref().unwrap_or("-")
                    );
                    identity = probed;
                },
                Err(e) => {
                    error!("Unable to determine the instance identity: {e:#}");
                },
            }
        }

        if let Some(instance_id) = &self.config.instance_id {
            info!("Instance id overridden with {instance_id}");
            identity.instance_id = Some(instance_id.clone());
        }

        identity
    }
}

/// Receives encoded measurements.
pub trait MetricSink: Send + Sync {
    /// Delivers one measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if the measurement cannot be delivered.
    fn record(&self, measurement: Measurement) -> Result<()>;
}

/// A sink that keeps measurements in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    measurements: Mutex<Vec<Measurement>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every recorded measurement.
    pub fn take(&self) -> Vec<Measurement> {
        std::mem::take(
            &mut *self
                .measurements
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl MetricSink for MemorySink {
    fn record(&self, measurement: Measurement) -> Result<()> {
        self.measurements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(measurement);
        Ok(())
    }
}
