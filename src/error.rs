//! Error types for startup and the Discord transport.
//!
//! Everything that reaches `main` is fatal: it is logged once and the process
//! exits with a failure status. Delivery and selection problems never get here,
//! they are logged where they happen and the bot keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned from startup.
#[derive(Error, Debug)]
pub enum AppError {
    /// The configuration is absent, incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The log sinks could not be installed.
    #[error("Failed to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    /// Discord client error from Serenity.
    ///
    /// Boxed because `serenity::Error` is large.
    #[error(transparent)]
    Discord(#[from] Box<serenity::Error>),
}

impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::Discord(Box::new(err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration existed, a default one has been written.
    #[error("Configuration not found. Re-created it at {0}, review it before starting again")]
    Created(PathBuf),

    /// Keys were missing and have been filled with defaults.
    #[error("Missing keys {0:?} in configuration. Re-created them with default values, restart the program to continue")]
    MissingKeys(Vec<String>),

    #[error("Provided discord token is not valid")]
    InvalidToken,

    /// A value is present but unusable.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_surface_unchanged() {
        let err: AppError = ConfigError::InvalidToken.into();
        assert!(matches!(err, AppError::Config(ConfigError::InvalidToken)));
        assert_eq!(err.to_string(), "Provided discord token is not valid");
    }
}
