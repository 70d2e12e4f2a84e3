//! `sysdom init`: writes a starter `sysdom.toml`.

use std::fs;
use std::path::PathBuf;

use sysdom_config::CONFIG_FILE_NAME;

use crate::GlobalArgs;

const TEMPLATE: &str = r#"# Sysdom simulation settings.

[simulation]
# Timed waits are rounded down to a multiple of this.
resolution = "1ps"
# time_limit = "10us"
max_deltas = 10000
# Make two writers of one ordinary signal in a delta cycle fatal.
strict_drivers = false

[elaboration]
halt_on_error = true

[waveform]
enabled = false
path = "out/waves.vcd"

[profiles.trace]
waveform = true

[profiles.quick]
time_limit = "1us"
"#;

/// Runs the `sysdom init` command. Returns exit code 0 on success.
pub fn run(dir: Option<String>, force: bool, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&dir)?;
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    fs::write(&path, TEMPLATE)?;
    if !global.quiet {
        eprintln!("     Created {}", path.display());
    }
    Ok(0)
}
