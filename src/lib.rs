//! stream-bench: throughput load-test harness for distributed
//! stream-processing clusters
//!
//! The harness builds a layered synthetic processing graph, submits one or
//! more instances of it through a [`client::ClusterClient`], polls the
//! cluster on a cadence-aligned schedule until it reaches steady state,
//! averages throughput over a fixed measurement window, and guarantees
//! teardown of everything it started.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod measure;
pub mod metrics;
pub mod schedule;
pub mod session;
pub mod topology;

pub use client::{ClientError, ClusterClient, ControllerClient, LocalCluster, RunHandle};
pub use config::{ConfigError, HarnessConfig};
pub use error::{BenchError, BenchResult};
pub use measure::{MeasureConfig, MeasureOutcome};
pub use metrics::{AggregateSample, MetricsState};
pub use session::{Session, SessionState};
pub use topology::{GraphSpec, StageSpec};
