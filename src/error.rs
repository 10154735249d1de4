//! Harness-level error taxonomy

use crate::client::ClientError;
use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by a benchmark session
///
/// Errors raised while submitting or measuring are deferred until teardown
/// has run for every instance the session started; teardown failures
/// themselves are logged per instance and never escalated.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid harness configuration (pre-submission, no cleanup needed)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A graph instance failed to start
    #[error("failed to submit graph instance '{name}': {source}")]
    Submission {
        /// Name the instance was submitted under
        name: String,
        /// Underlying client failure
        source: ClientError,
    },

    /// A status poll failed during warm-up or measurement
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The session was interrupted (Ctrl+C) before completing
    #[error("session interrupted")]
    Interrupted,
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
