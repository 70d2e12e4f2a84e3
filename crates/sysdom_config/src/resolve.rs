//! Profile resolution: base settings with a named profile laid on top.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::PathBuf;
use sysdom_common::Time;

/// Flat settings the kernel is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    /// Wait quantum.
    pub resolution: Time,
    /// Run limit.
    pub time_limit: Option<Time>,
    /// Delta-cycle bound per time step.
    pub max_deltas: u32,
    /// Fatal multiple drivers.
    pub strict_drivers: bool,
    /// Fail elaboration on error issues.
    pub halt_on_error: bool,
    /// VCD output path, `None` when recording is off.
    pub waveform: Option<PathBuf>,
}

/// Merges the base configuration with `profile`, or returns the base
/// configuration when `profile` is `None`.
pub fn resolve_profile(
    config: &ProjectConfig,
    profile: Option<&str>,
) -> Result<ResolvedSettings, ConfigError> {
    let sim = &config.simulation;
    let mut settings = ResolvedSettings {
        resolution: sim.resolution,
        time_limit: sim.time_limit,
        max_deltas: sim.max_deltas,
        strict_drivers: sim.strict_drivers,
        halt_on_error: config.elaboration.halt_on_error,
        waveform: config
            .waveform
            .enabled
            .then(|| config.waveform.path.clone())
            .flatten(),
    };

    let Some(name) = profile else {
        return Ok(settings);
    };
    let overlay = config
        .profiles
        .get(name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

    if overlay.time_limit.is_some() {
        settings.time_limit = overlay.time_limit;
    }
    if let Some(max) = overlay.max_deltas {
        settings.max_deltas = max;
    }
    if let Some(strict) = overlay.strict_drivers {
        settings.strict_drivers = strict;
    }
    let path = overlay
        .waveform_path
        .clone()
        .or_else(|| config.waveform.path.clone());
    match overlay.waveform {
        Some(true) => {
            settings.waveform =
                Some(path.ok_or_else(|| ConfigError::MissingField(format!("profiles.{name}.waveform_path")))?);
        }
        Some(false) => settings.waveform = None,
        None if overlay.waveform_path.is_some() && settings.waveform.is_some() => {
            settings.waveform = path;
        }
        None => {}
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const BASE: &str = r#"
[simulation]
time_limit = "1us"
max_deltas = 100

[waveform]
enabled = true
path = "base.vcd"

[profiles.quiet]
waveform = false
max_deltas = 10

[profiles.soak]
time_limit = "1ms"
waveform_path = "soak.vcd"

[profiles.traced]
waveform = true
"#;

    #[test]
    fn base_without_profile() {
        let config = load_config_from_str(BASE).unwrap();
        let s = resolve_profile(&config, None).unwrap();
        assert_eq!(s.time_limit, Some(Time::ns(1_000)));
        assert_eq!(s.max_deltas, 100);
        assert_eq!(s.waveform, Some(PathBuf::from("base.vcd")));
        assert!(s.halt_on_error);
    }

    #[test]
    fn profile_overrides() {
        let config = load_config_from_str(BASE).unwrap();
        let quiet = resolve_profile(&config, Some("quiet")).unwrap();
        assert_eq!(quiet.max_deltas, 10);
        assert_eq!(quiet.waveform, None);
        assert_eq!(quiet.time_limit, Some(Time::ns(1_000)));

        let soak = resolve_profile(&config, Some("soak")).unwrap();
        assert_eq!(soak.time_limit, Some(Time::new(1, sysdom_common::TimeUnit::Ms)));
        assert_eq!(soak.waveform, Some(PathBuf::from("soak.vcd")));
    }

    #[test]
    fn profile_enables_waveform_with_base_path() {
        let config = load_config_from_str(BASE).unwrap();
        let traced = resolve_profile(&config, Some("traced")).unwrap();
        assert_eq!(traced.waveform, Some(PathBuf::from("base.vcd")));
    }

    #[test]
    fn enabling_without_any_path_fails() {
        let config = load_config_from_str("[profiles.t]\nwaveform = true\n").unwrap();
        let err = resolve_profile(&config, Some("t")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn unknown_profile() {
        let config = load_config_from_str("").unwrap();
        let err = resolve_profile(&config, Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(ref n) if n == "nope"));
    }
}
