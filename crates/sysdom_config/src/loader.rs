//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "sysdom.toml";

/// Loads and validates `<project_dir>/sysdom.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    let sim = &config.simulation;
    if sim.resolution.is_zero() {
        return Err(ConfigError::ValidationError(
            "simulation.resolution must be positive".to_string(),
        ));
    }
    if sim.max_deltas == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.max_deltas must be positive".to_string(),
        ));
    }
    if config.waveform.enabled && config.waveform.path.is_none() {
        return Err(ConfigError::MissingField("waveform.path".to_string()));
    }
    for (name, profile) in &config.profiles {
        if profile.max_deltas == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "profiles.{name}.max_deltas must be positive"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use sysdom_common::Time;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[simulation]
resolution = "1ps"
time_limit = "1us"
max_deltas = 500
strict_drivers = true

[elaboration]
halt_on_error = false

[waveform]
enabled = true
path = "out/waves.vcd"

[profiles.quick]
time_limit = "100ns"
waveform = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.simulation.resolution, Time::ps(1));
        assert_eq!(config.simulation.time_limit, Some(Time::ns(1_000)));
        assert_eq!(config.simulation.max_deltas, 500);
        assert!(config.simulation.strict_drivers);
        assert!(!config.elaboration.halt_on_error);
        assert_eq!(config.waveform.path, Some(PathBuf::from("out/waves.vcd")));
        assert!(config.profiles.contains_key("quick"));
    }

    #[test]
    fn zero_resolution_rejected() {
        let err = load_config_from_str("[simulation]\nresolution = \"0ns\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_max_deltas_rejected() {
        let err = load_config_from_str("[simulation]\nmax_deltas = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        let err = load_config_from_str("[profiles.p]\nmax_deltas = 0\n").unwrap_err();
        assert!(err.to_string().contains("profiles.p.max_deltas"));
    }

    #[test]
    fn enabled_waveform_needs_path() {
        let err = load_config_from_str("[waveform]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "waveform.path"));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("[simulation\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[simulation]\nmax_deltas = 7\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.simulation.max_deltas, 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
