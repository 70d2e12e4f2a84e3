//! Discrete-event simulation kernel with HDL-style signals and processes.
//!
//! A design is built in three steps on a [`Kernel`]:
//!
//! 1. **Construction**: create signals, events, components and processes and
//!    wire up ownership and ports.
//! 2. [`Kernel::elaborate`]: runs design analysis and the component
//!    initialization hooks, checks port bindings and starts every process.
//! 3. [`Kernel::run`] (or `run_until`, `run_for`, `step`): executes time
//!    steps made of delta cycles until idle, a time limit or a stop request.
//!
//! Process bodies never see signal writes of the current delta cycle: all
//! writes are staged and committed together after every ready process ran.
//! Conditions in the design (multiple declarations, unbound ports, memory
//! collisions) are reported through the kernel's
//! [`IssueSink`](sysdom_diagnostics::IssueSink), while misuse of the API is
//! returned as a [`SimError`].

#![warn(missing_docs)]

pub mod component;
pub mod components;
pub mod context;
pub mod derived;
pub mod error;
pub mod event;
pub mod kernel;
pub mod lifecycle;
pub mod phase;
pub mod process;
pub mod signal;
pub mod time;
pub mod value;
pub mod waveform;

pub use component::{Component, ComponentCollection, DesignObject};
pub use context::ProcessContext;
pub use derived::{DerivedSignal, Source};
pub use error::SimError;
pub use kernel::{Kernel, ProcessBuilder, RunOutcome, SimStats};
pub use lifecycle::Lifecycle;
pub use phase::Phase;
pub use process::{LocalSlot, Step, Thread, Wait};
pub use signal::{SignalRef, SignalStore};
pub use time::SimTime;
pub use value::{SignalValue, Writer};
pub use waveform::{VcdRecorder, WaveformRecorder};

use sysdom_common::Time;
use sysdom_config::ResolvedSettings;

/// Kernel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Wait quantum. Timed waits are rounded down to a multiple of it.
    pub resolution: Time,
    /// Default limit for [`Kernel::run`].
    pub time_limit: Option<Time>,
    /// Delta cycles allowed within one time step.
    pub max_deltas: u32,
    /// Make two writers of an ordinary signal in one delta cycle fatal.
    pub strict_drivers: bool,
    /// Fail elaboration when error issues were reported.
    pub halt_on_error: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            resolution: Time::from_fs(1),
            time_limit: None,
            max_deltas: 10_000,
            strict_drivers: false,
            halt_on_error: true,
        }
    }
}

impl SimConfig {
    /// Kernel settings from a resolved `sysdom.toml` profile.
    pub fn from_settings(settings: &ResolvedSettings) -> Self {
        Self {
            resolution: settings.resolution,
            time_limit: settings.time_limit,
            max_deltas: settings.max_deltas,
            strict_drivers: settings.strict_drivers,
            halt_on_error: settings.halt_on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysdom_config::{load_config_from_str, resolve_profile};

    #[test]
    fn config_from_settings() {
        let config = load_config_from_str(
            r#"
[simulation]
resolution = "1ps"
time_limit = "1us"
max_deltas = 50
strict_drivers = true
"#,
        )
        .unwrap();
        let settings = resolve_profile(&config, None).unwrap();
        let sim = SimConfig::from_settings(&settings);
        assert_eq!(sim.resolution, Time::ps(1));
        assert_eq!(sim.time_limit, Some(Time::ns(1_000)));
        assert_eq!(sim.max_deltas, 50);
        assert!(sim.strict_drivers);
        assert!(sim.halt_on_error);
    }

    #[test]
    fn defaults() {
        let c = SimConfig::default();
        assert_eq!(c.max_deltas, 10_000);
        assert!(c.time_limit.is_none());
    }
}
