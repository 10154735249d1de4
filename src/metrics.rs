//! Cluster metrics sampling and steady-state detection
//!
//! One poll is a pure reduction of controller status into an
//! [`AggregateSample`], followed by a [`MetricsState::observe`] step that
//! computes deltas against the previous poll and decides whether the
//! cluster has reached steady state. The state is created once per session
//! and threaded through every poll; nothing here is shared or persisted.

use crate::client::{ClientError, ClusterClient};
use serde::{Deserialize, Serialize};

/// Aggregate counters reduced from one cluster snapshot
///
/// Source-task counters span every running instance; the harness measures
/// a batch of instances in aggregate, not per-instance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregateSample {
    /// Total worker slots on the cluster
    pub total_slots: u32,

    /// Currently allocated worker slots
    pub used_slots: u32,

    /// Number of running graph instances
    pub instances: usize,

    /// Source tasks across all instances
    pub source_tasks: usize,

    /// Source tasks that have reported at least one non-empty metrics record
    pub source_tasks_with_metrics: usize,

    /// Lifetime emitted count summed over all source tasks' default channel
    pub total_emitted: u64,
}

/// Take one sample: a cluster snapshot plus the source-stage task reports
/// of every running instance, reduced to aggregate counters
///
/// A task that has not yet reported metrics contributes zero to the emitted
/// total and is excluded from `source_tasks_with_metrics`; a task that
/// reported an actual zero is counted. Client errors propagate unchanged.
pub async fn sample_cluster(
    client: &dyn ClusterClient,
    source_stage: &str,
) -> Result<AggregateSample, ClientError> {
    let snapshot = client.cluster_snapshot().await?;

    let mut sample = AggregateSample {
        total_slots: snapshot.total_slots,
        used_slots: snapshot.used_slots,
        instances: snapshot.instances.len(),
        ..Default::default()
    };

    for instance in &snapshot.instances {
        for report in client.task_reports(&instance.id, source_stage).await? {
            sample.source_tasks += 1;
            if report.has_metrics() {
                sample.source_tasks_with_metrics += 1;
                sample.total_emitted += report.default_channel_emitted();
            }
        }
    }

    Ok(sample)
}

/// What one observation step produced
#[derive(Debug, Clone, Copy)]
pub struct PollReading {
    /// Wall-clock milliseconds since the previous poll
    pub elapsed_ms: u64,

    /// Change in the emitted total since the previous poll
    ///
    /// Signed: a restarted instance can make the lifetime total regress.
    pub emitted_delta: i64,

    /// Messages per millisecond over the elapsed window; 0.0 when the
    /// elapsed time is zero or the delta is not positive
    pub throughput: f64,

    /// Whether the cluster has reached steady state
    pub steady: bool,
}

/// Accumulator carried across polls within one measurement session
#[derive(Debug, Clone)]
pub struct MetricsState {
    transferred: u64,
    last_time_ms: u64,
    used_slots: u32,
    last_throughput: f64,
}

impl MetricsState {
    /// Create a fresh state anchored at `now_ms`
    pub fn new(now_ms: u64) -> Self {
        Self {
            transferred: 0,
            last_time_ms: now_ms,
            used_slots: 0,
            last_throughput: 0.0,
        }
    }

    /// Fold one sample into the state and report what changed
    ///
    /// Steady state requires all of: slots are in use, slot usage did not
    /// change since the previous poll, source tasks exist, and every source
    /// task has reported metrics. Anything less means the batch is still
    /// scheduling or its metrics have not populated, and a measurement
    /// window started there would fold cold-start throughput into the mean.
    pub fn observe(&mut self, sample: &AggregateSample, now_ms: u64) -> PollReading {
        let used_slots_delta = sample.used_slots as i64 - self.used_slots as i64;
        let emitted_delta = sample.total_emitted as i64 - self.transferred as i64;
        let elapsed_ms = now_ms.saturating_sub(self.last_time_ms);

        let throughput = if elapsed_ms == 0 || emitted_delta <= 0 {
            0.0
        } else {
            emitted_delta as f64 / elapsed_ms as f64
        };

        self.transferred = sample.total_emitted;
        self.last_time_ms = now_ms;
        self.used_slots = sample.used_slots;
        self.last_throughput = throughput;

        let steady = sample.used_slots > 0
            && used_slots_delta == 0
            && sample.source_tasks > 0
            && sample.source_tasks_with_metrics >= sample.source_tasks;

        PollReading {
            elapsed_ms,
            emitted_delta,
            throughput,
            steady,
        }
    }

    /// Throughput computed by the most recent observation
    pub fn last_throughput(&self) -> f64 {
        self.last_throughput
    }
}
