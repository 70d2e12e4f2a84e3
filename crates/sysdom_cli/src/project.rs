//! Locating and loading `sysdom.toml`.

use std::path::{Path, PathBuf};

use sysdom_config::{ProjectConfig, CONFIG_FILE_NAME};
use tracing::debug;

use crate::GlobalArgs;

/// Where the configuration is read from: `--config` (a file or the
/// directory holding it), else the current directory.
pub fn config_dir(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                Ok(p)
            } else {
                Ok(p.parent()
                    .filter(|d| !d.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")))
            }
        }
        None => Ok(std::env::current_dir()?),
    }
}

/// Loads the project configuration. Without a `sysdom.toml` the defaults
/// apply, unless `--config` named a file that does not exist.
pub fn load(global: &GlobalArgs) -> Result<ProjectConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &global.config {
        let p = Path::new(path);
        if !p.is_dir() && !p.exists() {
            return Err(format!("configuration file {} not found", p.display()).into());
        }
        if p.is_file() {
            let text = std::fs::read_to_string(p)?;
            debug!(path = %p.display(), "loading configuration");
            return Ok(sysdom_config::load_config_from_str(&text)?);
        }
    }
    let dir = config_dir(global)?;
    if !dir.join(CONFIG_FILE_NAME).is_file() {
        debug!(dir = %dir.display(), "no configuration file, using defaults");
        return Ok(ProjectConfig::default());
    }
    debug!(dir = %dir.display(), "loading configuration");
    Ok(sysdom_config::load_config(&dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn config_file_and_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&file, "[simulation]\nmax_deltas = 7\n").unwrap();

        let by_file = load(&global(Some(file.to_str().unwrap().to_string()))).unwrap();
        assert_eq!(by_file.simulation.max_deltas, 7);
        let by_dir = load(&global(Some(tmp.path().to_str().unwrap().to_string()))).unwrap();
        assert_eq!(by_dir.simulation.max_deltas, 7);
        assert_eq!(
            config_dir(&global(Some(file.to_str().unwrap().to_string()))).unwrap(),
            tmp.path()
        );
    }

    #[test]
    fn missing_file_in_directory_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load(&global(Some(tmp.path().to_str().unwrap().to_string()))).unwrap();
        assert_eq!(config.simulation.max_deltas, 10_000);
        assert!(config.elaboration.halt_on_error);
    }

    #[test]
    fn named_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("other.toml");
        assert!(load(&global(Some(missing.to_str().unwrap().to_string()))).is_err());
    }

    #[test]
    fn invalid_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[simulation]\nmax_deltas = 0\n").unwrap();
        assert!(load(&global(Some(tmp.path().to_str().unwrap().to_string()))).is_err());
    }
}
