use core::fmt;

use crate::ConfigError;

/// Effective connection class as reported by the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum NetworkClass {
    #[default]
    Unknown,
    #[cfg_attr(feature = "serde", serde(rename = "slow-2g"))]
    Slow2g,
    #[cfg_attr(feature = "serde", serde(rename = "2g"))]
    TwoG,
    #[cfg_attr(feature = "serde", serde(rename = "3g"))]
    ThreeG,
    #[cfg_attr(feature = "serde", serde(rename = "4g"))]
    FourG,
}

impl NetworkClass {
    /// Parses an effective-type label (`"slow-2g"`, `"2g"`, `"3g"`, `"4g"`). Anything else is
    /// `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Self::Slow2g,
            "2g" => Self::TwoG,
            "3g" => Self::ThreeG,
            "4g" => Self::FourG,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Slow2g => "slow-2g",
            Self::TwoG => "2g",
            Self::ThreeG => "3g",
            Self::FourG => "4g",
        }
    }

    pub fn is_slow(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only snapshot of device and network capability.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicySignals {
    pub device_memory_gib: f64,
    pub cpu_cores: u32,
    pub network_class: NetworkClass,
    pub downlink_mbps: f64,
}

impl PolicySignals {
    pub fn is_slow_network(&self) -> bool {
        self.network_class.is_slow() || self.downlink_mbps < 1.0
    }

    pub fn is_low_end_device(&self) -> bool {
        self.device_memory_gib <= 2.0 || self.cpu_cores <= 2
    }

    pub fn with_network(mut self, network_class: NetworkClass, downlink_mbps: f64) -> Self {
        self.network_class = network_class;
        self.downlink_mbps = downlink_mbps;
        self
    }
}

/// Signals assumed before the environment has reported anything: a capable device on an
/// unclassified network.
impl Default for PolicySignals {
    fn default() -> Self {
        Self {
            device_memory_gib: 8.0,
            cpu_cores: 8,
            network_class: NetworkClass::Unknown,
            downlink_mbps: 10.0,
        }
    }
}

/// Effective sizing and timeout values shared by every list session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Policy {
    pub batch_size: usize,
    /// Loaded sets larger than this are rendered through a window.
    pub virtualization_threshold: usize,
    pub load_timeout_ms: u64,
    pub preload_critical_routes: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            batch_size: 25,
            virtualization_threshold: 100,
            load_timeout_ms: 30_000,
            preload_critical_routes: true,
        }
    }
}

impl Policy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidPolicy {
                field: "batch_size",
            });
        }
        if self.virtualization_threshold == 0 {
            return Err(ConfigError::InvalidPolicy {
                field: "virtualization_threshold",
            });
        }
        if self.load_timeout_ms == 0 {
            return Err(ConfigError::InvalidPolicy {
                field: "load_timeout_ms",
            });
        }
        Ok(())
    }

    /// Applies consumer overrides on top of this policy.
    pub fn merge(&self, overrides: &PolicyOverrides) -> Result<Self, ConfigError> {
        let merged = Self {
            batch_size: overrides.batch_size.unwrap_or(self.batch_size),
            virtualization_threshold: overrides
                .virtualization_threshold
                .unwrap_or(self.virtualization_threshold),
            load_timeout_ms: overrides.load_timeout_ms.unwrap_or(self.load_timeout_ms),
            preload_critical_routes: overrides
                .preload_critical_routes
                .unwrap_or(self.preload_critical_routes),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn derive(&self, signals: &PolicySignals) -> Self {
        derive(signals, self)
    }
}

/// Explicit per-field overrides for a [`Policy`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PolicyOverrides {
    pub batch_size: Option<usize>,
    pub virtualization_threshold: Option<usize>,
    pub load_timeout_ms: Option<u64>,
    pub preload_critical_routes: Option<bool>,
}

const SLOW_NETWORK_BATCH_SIZE: usize = 10;
const SLOW_NETWORK_TIMEOUT_MS: u64 = 60_000;
const LOW_END_BATCH_SIZE: usize = 15;
const LOW_END_VIRTUALIZATION_THRESHOLD: usize = 50;

/// Derives the effective policy for `signals`. Pure and total.
///
/// - Slow network: `batch_size <= 10`, no critical-route preloading, `load_timeout_ms >= 60s`.
/// - Low-end device: `virtualization_threshold <= 50`, `batch_size <= 15`.
///
/// When both apply, each field takes the stricter value.
pub fn derive(signals: &PolicySignals, base: &Policy) -> Policy {
    let mut policy = *base;

    if signals.is_slow_network() {
        policy.batch_size = policy.batch_size.min(SLOW_NETWORK_BATCH_SIZE);
        policy.preload_critical_routes = false;
        policy.load_timeout_ms = policy.load_timeout_ms.max(SLOW_NETWORK_TIMEOUT_MS);
    }

    if signals.is_low_end_device() {
        policy.virtualization_threshold = policy
            .virtualization_threshold
            .min(LOW_END_VIRTUALIZATION_THRESHOLD);
        policy.batch_size = policy.batch_size.min(LOW_END_BATCH_SIZE);
    }

    ptrace!(?signals, ?policy, "policy::derive");
    policy
}
