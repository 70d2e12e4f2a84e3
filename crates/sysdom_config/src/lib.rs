//! Loading and validation of `sysdom.toml` kernel configuration.
//!
//! The file configures the simulation kernel (time resolution, run limit,
//! delta-cycle bound, driver strictness), elaboration policy and waveform
//! output. Named `[profiles.*]` tables override the base settings and are
//! merged by [`resolve_profile`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_profile, ResolvedSettings};
pub use types::*;
