//! Error types for adapters.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when querying Postfix state.
///
/// The scrape engine never propagates these to a poller; they are logged
/// and the affected gauge reads zero.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The external tool could not be started.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: String },

    /// The external tool did not finish in time and was killed.
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool output could not be interpreted.
    #[error("Failed to parse output: {0}")]
    Parse(String),
}
