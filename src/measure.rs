//! Warm-up and measurement phases
//!
//! One session runs both phases on a single cadence grid: poll until the
//! steady-state detector fires, pause one cycle, then sample throughput for
//! the configured window and report the arithmetic mean. Per-poll status
//! rows go to stdout; they are the harness's data output.

use crate::client::{ClientError, ClusterClient};
use crate::metrics::{sample_cluster, AggregateSample, MetricsState, PollReading};
use crate::schedule::Cadence;
use std::time::Duration;
use tokio::time::Instant;

/// Parameters for one measurement run
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    /// Interval between polls
    pub poll_interval: Duration,

    /// Length of the measurement window
    pub duration: Duration,

    /// Stage whose tasks are sampled for emitted counts
    pub source_stage: String,
}

/// Final result of a measurement run
#[derive(Debug, Clone, Copy)]
pub struct MeasureOutcome {
    /// Number of polls taken during the measurement window
    pub polls: usize,

    /// Arithmetic mean of the per-poll throughput values, in messages
    /// per millisecond
    pub mean_throughput: f64,
}

fn print_header() {
    println!(
        "status\tinstances\ttotalSlots\tslotsUsed\ttargetTasks\t\
         targetTasksWithMetrics\ttime\ttime-diff ms\temitted\tthroughput (kmsg/s)"
    );
}

fn print_row(phase: &str, sample: &AggregateSample, reading: &PollReading) {
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        phase,
        sample.instances,
        sample.total_slots,
        sample.used_slots,
        sample.source_tasks,
        sample.source_tasks_with_metrics,
        chrono::Utc::now().timestamp_millis(),
        reading.elapsed_ms,
        reading.emitted_delta,
        reading.throughput,
    );
}

/// Run warm-up followed by the measurement window
///
/// Warm-up polls indefinitely until steady state; there is deliberately no
/// timeout, a cluster that never stabilizes blocks until interrupted. The
/// measurement window always takes at least one sample. A failed poll in
/// either phase propagates immediately; the caller owns teardown.
pub async fn run_measurement(
    client: &dyn ClusterClient,
    config: &MeasureConfig,
) -> Result<MeasureOutcome, ClientError> {
    print_header();

    let start = Instant::now();
    let cadence = Cadence::new(start, config.poll_interval);
    let mut state = MetricsState::new(0);
    let monotonic_ms = || Instant::now().duration_since(start).as_millis() as u64;

    // Warm-up: poll until slot allocation has settled and every source
    // task is reporting.
    loop {
        let sample = sample_cluster(client, &config.source_stage).await?;
        let reading = state.observe(&sample, monotonic_ms());
        print_row("WAITING", &sample, &reading);
        if reading.steady {
            tracing::info!(
                used_slots = sample.used_slots,
                source_tasks = sample.source_tasks,
                "steady state reached"
            );
            break;
        }
        cadence.pause().await;
    }

    // One clean cycle between phases so the first measured interval does
    // not start mid-slot.
    cadence.pause().await;

    let end = Instant::now() + config.duration;
    let mut throughput_sum = 0.0;
    let mut polls = 0usize;
    loop {
        let sample = sample_cluster(client, &config.source_stage).await?;
        let reading = state.observe(&sample, monotonic_ms());
        print_row("RUNNING", &sample, &reading);
        throughput_sum += reading.throughput;
        polls += 1;
        cadence.pause().await;
        if Instant::now() >= end {
            break;
        }
    }

    let mean_throughput = throughput_sum / polls as f64;
    println!("RUNNING {polls} polls, mean throughput {mean_throughput} kmsg/s");
    tracing::info!(polls, mean_throughput, "measurement window complete");

    Ok(MeasureOutcome {
        polls,
        mean_throughput,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        ClusterSnapshot, InstanceSummary, RunHandle, TaskReport, WorkerConfig, DEFAULT_CHANNEL,
    };
    use crate::topology::GraphSpec;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Client that is steady from the first poll: constant slot usage and
    /// a single source task emitting at a fixed rate
    struct SteadyClient {
        started: Instant,
        rate_per_sec: u64,
    }

    impl SteadyClient {
        fn new(rate_per_sec: u64) -> Self {
            Self {
                started: Instant::now(),
                rate_per_sec,
            }
        }
    }

    #[async_trait]
    impl ClusterClient for SteadyClient {
        async fn submit(
            &self,
            _name: &str,
            _graph: &GraphSpec,
            _config: &WorkerConfig,
        ) -> Result<RunHandle, ClientError> {
            unimplemented!("not used by measurement tests")
        }

        async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
            Ok(ClusterSnapshot {
                total_slots: 16,
                used_slots: 4,
                instances: vec![InstanceSummary {
                    id: "a".into(),
                    name: "test-0".into(),
                }],
            })
        }

        async fn task_reports(
            &self,
            _instance_id: &str,
            _stage: &str,
        ) -> Result<Vec<TaskReport>, ClientError> {
            let elapsed_ms = Instant::now().duration_since(self.started).as_millis() as u64;
            let mut emitted = HashMap::new();
            emitted.insert(
                DEFAULT_CHANNEL.to_string(),
                self.rate_per_sec * elapsed_ms / 1000,
            );
            Ok(vec![TaskReport {
                task_id: 0,
                emitted: Some(emitted),
            }])
        }

        async fn teardown(
            &self,
            _handle: &RunHandle,
            _grace: Duration,
        ) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn config(poll_secs: u64, duration_secs: u64) -> MeasureConfig {
        MeasureConfig {
            poll_interval: Duration::from_secs(poll_secs),
            duration: Duration::from_secs(duration_secs),
            source_stage: "source".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_four_second_polls_over_two_minutes_take_thirty_samples() {
        let client = SteadyClient::new(1000);

        let outcome = run_measurement(&client, &config(4, 120)).await.unwrap();

        // Steady on the second warm-up poll (the first poll's slot count
        // is itself a delta), then a 120s window at 4s cadence.
        assert_eq!(outcome.polls, 30);
        // 1000 msg/s is 1.0 msg/ms at every measured interval
        assert!((outcome.mean_throughput - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_least_one_sample_for_zero_duration() {
        let client = SteadyClient::new(1000);

        let outcome = run_measurement(&client, &config(4, 0)).await.unwrap();

        assert_eq!(outcome.polls, 1);
        assert!((outcome.mean_throughput - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_propagates() {
        struct FailingClient;

        #[async_trait]
        impl ClusterClient for FailingClient {
            async fn submit(
                &self,
                _name: &str,
                _graph: &GraphSpec,
                _config: &WorkerConfig,
            ) -> Result<RunHandle, ClientError> {
                unimplemented!()
            }

            async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
                Err(ClientError::Api {
                    status: 503,
                    message: "controller down".into(),
                })
            }

            async fn task_reports(
                &self,
                _instance_id: &str,
                _stage: &str,
            ) -> Result<Vec<TaskReport>, ClientError> {
                unimplemented!()
            }

            async fn teardown(
                &self,
                _handle: &RunHandle,
                _grace: Duration,
            ) -> Result<(), ClientError> {
                Ok(())
            }
        }

        let result = run_measurement(&FailingClient, &config(4, 120)).await;
        assert!(matches!(result, Err(ClientError::Api { status: 503, .. })));
    }
}
