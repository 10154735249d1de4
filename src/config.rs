//! Harness configuration and validation

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Full configuration for one benchmark session
///
/// Built from the CLI surface; validated once before anything is submitted
/// to the cluster, so a bad configuration never creates cleanup obligations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Size of the synthetic messages, in bytes
    pub message_size: usize,

    /// Number of graph instances to run in parallel
    pub instances: usize,

    /// Number of relay levels downstream of the source stage
    pub levels: u32,

    /// Parallelism of the source stage
    pub source_parallelism: u32,

    /// Parallelism of each relay stage
    pub relay_parallelism: u32,

    /// Worker processes per graph instance
    pub workers: u32,

    /// Acker tasks per instance (forced to 0 when acking is disabled)
    pub ackers: u32,

    /// Maximum pending unacknowledged messages per source task
    pub max_pending: u32,

    /// Whether message acking is enabled
    pub ack_enabled: bool,

    /// Base name for submitted instances; an ordinal is appended per instance
    pub name: String,

    /// Seconds between metrics polls
    pub poll_interval_secs: u64,

    /// Length of the measurement window, in seconds
    pub duration_secs: u64,

    /// Grace period handed to the cluster on teardown, in seconds
    pub teardown_grace_secs: u64,

    /// Enable cluster-side debug output for submitted instances
    pub debug: bool,

    /// Run against the in-process simulated cluster
    pub local: bool,

    /// Base URL of the cluster controller (required unless `local`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_url: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            message_size: 100,
            instances: 1,
            levels: 1,
            source_parallelism: 3,
            relay_parallelism: 3,
            workers: 3,
            ackers: 0,
            max_pending: 1000,
            ack_enabled: false,
            name: "test".to_string(),
            poll_interval_secs: 4,
            duration_secs: 120,
            teardown_grace_secs: 1,
            debug: false,
            local: false,
            controller_url: None,
        }
    }
}

impl HarnessConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "need at least one worker per instance".into(),
            ));
        }

        if self.name.is_empty() {
            return Err(ConfigError::InvalidName(
                "instance base name must be non-empty".into(),
            ));
        }

        if self.instances == 0 {
            return Err(ConfigError::InvalidInstances(
                "need at least one graph instance".into(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval(
                "poll interval must be at least one second".into(),
            ));
        }

        if !self.local && self.controller_url.is_none() {
            return Err(ConfigError::MissingController(
                "a controller URL is required unless --local is set".into(),
            ));
        }

        Ok(())
    }

    /// Acker count actually submitted: acking disabled forces 0
    pub fn effective_ackers(&self) -> u32 {
        if self.ack_enabled {
            self.ackers
        } else {
            0
        }
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Measurement window as a duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Teardown grace period as a duration
    pub fn teardown_grace(&self) -> Duration {
        Duration::from_secs(self.teardown_grace_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid workers: {0}")]
    InvalidWorkers(String),

    /// Invalid instance base name
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Invalid instance count
    #[error("invalid instances: {0}")]
    InvalidInstances(String),

    /// Invalid poll interval
    #[error("invalid poll interval: {0}")]
    InvalidPollInterval(String),

    /// No controller endpoint and not running locally
    #[error("missing controller: {0}")]
    MissingController(String),

    /// Invalid graph shape parameters
    #[error("invalid graph shape: {0}")]
    InvalidGraphShape(String),
}
