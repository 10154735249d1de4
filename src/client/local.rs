//! In-process simulated cluster
//!
//! Backs the `--local` flag: a fixed slot pool where submitted instances
//! take a scheduling delay before their slots are allocated, a further
//! delay before source tasks report metrics, and then emit at a constant
//! per-task rate. Useful for exercising the full harness without a real
//! cluster, and for tests.

use super::{
    ClientError, ClusterClient, ClusterSnapshot, InstanceSummary, RunHandle, TaskReport,
    WorkerConfig, DEFAULT_CHANNEL,
};
use crate::topology::GraphSpec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Simulated cluster controller
pub struct LocalCluster {
    total_slots: u32,
    schedule_delay: Duration,
    metrics_delay: Duration,
    emit_rate: u64,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    instances: HashMap<String, Instance>,
}

struct Instance {
    name: String,
    submitted_at: Instant,
    workers: u32,
    graph: GraphSpec,
}

impl Instance {
    fn scheduled(&self, now: Instant, delay: Duration) -> bool {
        now.duration_since(self.submitted_at) >= delay
    }
}

impl LocalCluster {
    /// Create a simulated cluster with the given slot capacity
    pub fn new(total_slots: u32) -> Self {
        Self {
            total_slots,
            schedule_delay: Duration::from_secs(1),
            metrics_delay: Duration::from_secs(3),
            emit_rate: 10_000,
            state: Mutex::new(State::default()),
        }
    }

    /// Override the scheduling and metrics-reporting delays
    pub fn with_delays(mut self, schedule: Duration, metrics: Duration) -> Self {
        self.schedule_delay = schedule;
        self.metrics_delay = metrics;
        self
    }

    /// Override the per-task emit rate (messages per second)
    pub fn with_emit_rate(mut self, rate: u64) -> Self {
        self.emit_rate = rate;
        self
    }
}

#[async_trait]
impl ClusterClient for LocalCluster {
    async fn submit(
        &self,
        name: &str,
        graph: &GraphSpec,
        config: &WorkerConfig,
    ) -> Result<RunHandle, ClientError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = format!("local-{}", state.next_id);
        state.instances.insert(
            id.clone(),
            Instance {
                name: name.to_string(),
                submitted_at: Instant::now(),
                workers: config.num_workers,
                graph: graph.clone(),
            },
        );
        tracing::debug!(instance = %id, name, "simulated submission");
        Ok(RunHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
        let state = self.state.lock().await;
        let now = Instant::now();
        let used_slots = state
            .instances
            .values()
            .filter(|i| i.scheduled(now, self.schedule_delay))
            .map(|i| i.workers)
            .sum();
        let instances = state
            .instances
            .iter()
            .map(|(id, i)| InstanceSummary {
                id: id.clone(),
                name: i.name.clone(),
            })
            .collect();
        Ok(ClusterSnapshot {
            total_slots: self.total_slots,
            used_slots,
            instances,
        })
    }

    async fn task_reports(
        &self,
        instance_id: &str,
        stage: &str,
    ) -> Result<Vec<TaskReport>, ClientError> {
        let state = self.state.lock().await;
        let instance = state
            .instances
            .get(instance_id)
            .ok_or_else(|| ClientError::InstanceNotFound(instance_id.to_string()))?;

        let now = Instant::now();
        if !instance.scheduled(now, self.schedule_delay) {
            // Tasks do not exist until the instance is scheduled
            return Ok(Vec::new());
        }

        let stage_spec = instance
            .graph
            .stages()
            .iter()
            .find(|s| s.name == stage)
            .ok_or_else(|| ClientError::InstanceNotFound(format!("{instance_id}/{stage}")))?;

        let active = now
            .duration_since(instance.submitted_at)
            .saturating_sub(self.metrics_delay);
        let reporting = !active.is_zero();
        let emitted_per_task = self.emit_rate * active.as_millis() as u64 / 1000;

        let reports = (0..stage_spec.parallelism)
            .map(|task_id| TaskReport {
                task_id,
                emitted: reporting.then(|| {
                    let mut emitted = HashMap::new();
                    emitted.insert(DEFAULT_CHANNEL.to_string(), emitted_per_task);
                    emitted
                }),
            })
            .collect();
        Ok(reports)
    }

    async fn teardown(&self, handle: &RunHandle, grace: Duration) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        match state.instances.remove(&handle.id) {
            Some(_) => {
                tracing::debug!(instance = %handle.id, grace_secs = grace.as_secs(), "simulated teardown");
                Ok(())
            }
            None => Err(ClientError::InstanceNotFound(handle.id.clone())),
        }
    }
}
