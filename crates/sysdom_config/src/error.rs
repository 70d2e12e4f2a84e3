//! Configuration errors.

/// Errors raised while reading or validating `sysdom.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML was malformed or a value had the wrong shape.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A requested profile is not defined.
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    /// A value is required by another setting but absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value is out of range or inconsistent.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ConfigError::UnknownProfile("soak".into()).to_string(),
            "unknown profile 'soak'"
        );
        assert_eq!(
            ConfigError::MissingField("waveform.path".into()).to_string(),
            "missing required field: waveform.path"
        );
        assert_eq!(
            ConfigError::ValidationError("max_deltas must be positive".into()).to_string(),
            "validation error: max_deltas must be positive"
        );
    }

    #[test]
    fn io_error_converts() {
        let err: ConfigError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
