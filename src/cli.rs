//! CLI argument parsing

use crate::config::HarnessConfig;
use clap::Parser;

/// Throughput load test for distributed stream-processing clusters
///
/// Submits one or more synthetic layered processing graphs, waits for the
/// cluster to reach steady throughput, measures the mean over a fixed
/// window, and tears everything down.
#[derive(Parser, Debug)]
#[command(name = "stream-bench")]
#[command(author, version, about)]
pub struct Cli {
    /// Size of the generated messages in bytes
    #[arg(long, default_value_t = 100)]
    pub message_size: usize,

    /// Number of graph instances to run in parallel
    #[arg(short = 'n', long, default_value_t = 1)]
    pub instances: usize,

    /// Number of relay levels per graph
    #[arg(short = 'l', long, default_value_t = 1)]
    pub levels: u32,

    /// Number of source tasks to run in parallel
    #[arg(long, default_value_t = 3)]
    pub source_parallelism: u32,

    /// Number of relay tasks to run in parallel per level
    #[arg(long, default_value_t = 3)]
    pub relay_parallelism: u32,

    /// Number of workers to use per graph instance
    #[arg(long, default_value_t = 3)]
    pub workers: u32,

    /// Number of acker tasks to launch per instance
    #[arg(long, default_value_t = 0)]
    pub ackers: u32,

    /// Maximum pending unacked messages per source task (needs --ack)
    #[arg(long, default_value_t = 1000)]
    pub max_pending: u32,

    /// Enable message acking
    #[arg(long = "ack")]
    pub ack_enabled: bool,

    /// Base name of the submitted instances (an ordinal is appended)
    #[arg(long, default_value = "test")]
    pub name: String,

    /// How often metrics should be collected, in seconds
    #[arg(long, default_value_t = 4)]
    pub poll_interval: u64,

    /// How long the measurement window should run, in seconds
    #[arg(long, default_value_t = 120)]
    pub duration: u64,

    /// Teardown grace period handed to the cluster, in seconds
    #[arg(long, default_value_t = 1)]
    pub teardown_grace: u64,

    /// Enable cluster-side debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Run against an in-process simulated cluster
    #[arg(long)]
    pub local: bool,

    /// Base URL of the cluster controller (required unless --local)
    #[arg(long)]
    pub controller_url: Option<String>,
}

impl Cli {
    /// Convert parsed arguments into a harness configuration
    pub fn into_config(self) -> HarnessConfig {
        HarnessConfig {
            message_size: self.message_size,
            instances: self.instances,
            levels: self.levels,
            source_parallelism: self.source_parallelism,
            relay_parallelism: self.relay_parallelism,
            workers: self.workers,
            ackers: self.ackers,
            max_pending: self.max_pending,
            ack_enabled: self.ack_enabled,
            name: self.name,
            poll_interval_secs: self.poll_interval,
            duration_secs: self.duration,
            teardown_grace_secs: self.teardown_grace,
            debug: self.debug,
            local: self.local,
            controller_url: self.controller_url,
        }
    }
}
