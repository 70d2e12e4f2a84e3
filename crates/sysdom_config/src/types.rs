//! Configuration types deserialized from `sysdom.toml`.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use sysdom_common::Time;

/// The whole configuration file. Every table is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    /// Kernel settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Elaboration policy.
    #[serde(default)]
    pub elaboration: ElaborationConfig,
    /// Waveform output.
    #[serde(default)]
    pub waveform: WaveformConfig,
    /// Named overrides of `[simulation]` and `[waveform]`.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// `[simulation]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wait durations are rounded down to a multiple of this.
    #[serde(deserialize_with = "deserialize_time")]
    pub resolution: Time,
    /// Simulated time at which a run stops, if any.
    #[serde(deserialize_with = "deserialize_opt_time")]
    pub time_limit: Option<Time>,
    /// Delta cycles allowed within one time step before the run fails.
    pub max_deltas: u32,
    /// Make multiple drivers on an ordinary signal a fatal error.
    pub strict_drivers: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution: Time::from_fs(1),
            time_limit: None,
            max_deltas: 10_000,
            strict_drivers: false,
        }
    }
}

/// `[elaboration]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElaborationConfig {
    /// Fail elaboration when error-severity issues were reported.
    pub halt_on_error: bool,
}

impl Default for ElaborationConfig {
    fn default() -> Self {
        Self {
            halt_on_error: true,
        }
    }
}

/// `[waveform]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Record a VCD file.
    pub enabled: bool,
    /// Output path. Required when `enabled`.
    pub path: Option<PathBuf>,
}

/// `[profiles.<name>]`: every field overrides the base value when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Overrides `simulation.time_limit`.
    #[serde(deserialize_with = "deserialize_opt_time")]
    pub time_limit: Option<Time>,
    /// Overrides `simulation.max_deltas`.
    pub max_deltas: Option<u32>,
    /// Overrides `simulation.strict_drivers`.
    pub strict_drivers: Option<bool>,
    /// Overrides `waveform.enabled`.
    pub waveform: Option<bool>,
    /// Overrides `waveform.path`.
    pub waveform_path: Option<PathBuf>,
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(de::Error::custom)
}

fn deserialize_opt_time<'de, D>(deserializer: D) -> Result<Option<Time>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => text.parse().map(Some).map_err(de::Error::custom),
        None => Ok(None),
    }
}
