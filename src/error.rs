//! Error types for the exporter.

use thiserror::Error;

/// Fatal configuration problems, reported before the listener is bound.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Log summary collection from a logfile was requested without a path.
    #[error("Log summary collection requires --logfile unless --journal is set")]
    MissingLogfile,

    /// The listen address is not a socket address.
    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    /// The metrics path must be absolute and must not shadow the landing page.
    #[error("Invalid metrics path: {0:?}")]
    InvalidMetricsPath(String),

    /// A zero interval would regenerate the log summary on every poll.
    #[error("Log summary refresh interval must be at least one second")]
    ZeroRefreshInterval,

    /// A zero timeout would kill every external tool before it answers.
    #[error("Command timeout must be at least one second")]
    ZeroCommandTimeout,
}

/// Errors raised when registering collectors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two collectors describe a metric with the same fully-qualified name.
    #[error("Duplicate metric registration: {0}")]
    Duplicate(String),
}
