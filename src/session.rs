//! Benchmark session lifecycle
//!
//! A session walks Idle -> Submitting -> Measuring -> TearingDown -> Done.
//! Teardown is unconditional: once the first submission has been attempted,
//! every handle the session acquired is torn down before the session
//! returns, whether measurement succeeded, failed, was skipped because the
//! batch never fully submitted, or was interrupted from the outside.

use crate::client::{ClusterClient, RunHandle, WorkerConfig};
use crate::config::HarnessConfig;
use crate::error::{BenchError, BenchResult};
use crate::measure::{run_measurement, MeasureConfig, MeasureOutcome};
use crate::topology::{GraphSpec, SOURCE_STAGE};
use std::sync::Arc;

/// Lifecycle states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing submitted yet
    Idle,
    /// Graph instances are being submitted
    Submitting,
    /// The measurement loop is running
    Measuring,
    /// Acquired instances are being torn down
    TearingDown,
    /// Terminal
    Done,
}

/// One submit/measure/teardown session
pub struct Session {
    client: Arc<dyn ClusterClient>,
    config: HarnessConfig,
    handles: Vec<RunHandle>,
    state: SessionState,
}

impl Session {
    /// Create a session; nothing is submitted until [`Session::run`]
    pub fn new(client: Arc<dyn ClusterClient>, config: HarnessConfig) -> Self {
        Self {
            client,
            config,
            handles: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handles acquired so far
    pub fn handles(&self) -> &[RunHandle] {
        &self.handles
    }

    /// Run the full lifecycle: submit, measure, tear down
    ///
    /// Errors from submitting or measuring are deferred until after the
    /// teardown pass and never masked by teardown outcomes.
    pub async fn run(&mut self) -> BenchResult<MeasureOutcome> {
        let result = self.submit_and_measure().await;
        self.teardown_all().await;
        result
    }

    /// Like [`Session::run`], but a Ctrl+C during submit or measure aborts
    /// the body and still runs the full teardown pass
    pub async fn run_with_signal_handling(&mut self) -> BenchResult<MeasureOutcome> {
        let result = tokio::select! {
            res = self.submit_and_measure() => res,
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => tracing::warn!("interrupted, tearing down"),
                    Err(e) => tracing::error!(error = %e, "signal handler failed, tearing down"),
                }
                Err(BenchError::Interrupted)
            }
        };
        self.teardown_all().await;
        result
    }

    async fn submit_and_measure(&mut self) -> BenchResult<MeasureOutcome> {
        self.state = SessionState::Submitting;
        let graph = GraphSpec::build(
            self.config.levels,
            self.config.source_parallelism,
            self.config.relay_parallelism,
        )?;
        let worker_config = WorkerConfig {
            message_size: self.config.message_size,
            num_workers: self.config.workers,
            num_ackers: self.config.effective_ackers(),
            max_pending: self
                .config
                .ack_enabled
                .then_some(self.config.max_pending),
            debug: self.config.debug,
        };

        for ordinal in 0..self.config.instances {
            let name = format!("{}-{}", self.config.name, ordinal);
            tracing::info!(
                instance = %name,
                stages = graph.stages().len(),
                workers = worker_config.num_workers,
                "submitting graph instance"
            );
            // A partially-submitted batch is never measured; the first
            // failure aborts and leaves the rest unsubmitted.
            let handle = self
                .client
                .submit(&name, &graph, &worker_config)
                .await
                .map_err(|source| BenchError::Submission { name, source })?;
            self.handles.push(handle);
        }

        self.state = SessionState::Measuring;
        let measure_config = MeasureConfig {
            poll_interval: self.config.poll_interval(),
            duration: self.config.duration(),
            source_stage: SOURCE_STAGE.to_string(),
        };
        let outcome = run_measurement(self.client.as_ref(), &measure_config).await?;
        Ok(outcome)
    }

    /// Tear down every handle acquired so far, best effort
    ///
    /// Each handle's obligation is discharged exactly once; failures are
    /// logged per instance and never stop the remaining teardowns.
    async fn teardown_all(&mut self) {
        self.state = SessionState::TearingDown;
        let grace = self.config.teardown_grace();
        for handle in self.handles.drain(..) {
            tracing::info!(instance = %handle.name, "tearing down");
            if let Err(e) = self.client.teardown(&handle, grace).await {
                tracing::error!(instance = %handle.name, error = %e, "teardown failed");
            }
        }
        self.state = SessionState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        ClientError, ClusterSnapshot, InstanceSummary, TaskReport, DEFAULT_CHANNEL,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Scripted controller: optionally fails the nth submission or every
    /// poll, and records every teardown request
    struct ScriptedClient {
        started: Instant,
        fail_submission: Option<usize>,
        fail_polls: bool,
        submitted: Mutex<Vec<String>>,
        torn_down: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                started: Instant::now(),
                fail_submission: None,
                fail_polls: false,
                submitted: Mutex::new(Vec::new()),
                torn_down: Mutex::new(Vec::new()),
            }
        }

        fn fail_submission(mut self, ordinal: usize) -> Self {
            self.fail_submission = Some(ordinal);
            self
        }

        fn fail_polls(mut self) -> Self {
            self.fail_polls = true;
            self
        }

        fn torn_down(&self) -> Vec<String> {
            self.torn_down.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterClient for ScriptedClient {
        async fn submit(
            &self,
            name: &str,
            _graph: &GraphSpec,
            _config: &WorkerConfig,
        ) -> Result<RunHandle, ClientError> {
            let mut submitted = self.submitted.lock().unwrap();
            if self.fail_submission == Some(submitted.len()) {
                return Err(ClientError::Api {
                    status: 500,
                    message: "scheduler rejected".into(),
                });
            }
            submitted.push(name.to_string());
            Ok(RunHandle {
                id: format!("id-{name}"),
                name: name.to_string(),
            })
        }

        async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
            if self.fail_polls {
                return Err(ClientError::Api {
                    status: 503,
                    message: "controller down".into(),
                });
            }
            let instances = self
                .submitted
                .lock()
                .unwrap()
                .iter()
                .map(|name| InstanceSummary {
                    id: format!("id-{name}"),
                    name: name.clone(),
                })
                .collect::<Vec<_>>();
            Ok(ClusterSnapshot {
                total_slots: 16,
                used_slots: 3 * instances.len() as u32,
                instances,
            })
        }

        async fn task_reports(
            &self,
            _instance_id: &str,
            _stage: &str,
        ) -> Result<Vec<TaskReport>, ClientError> {
            let elapsed_ms = Instant::now().duration_since(self.started).as_millis() as u64;
            let mut emitted = HashMap::new();
            emitted.insert(DEFAULT_CHANNEL.to_string(), elapsed_ms);
            Ok(vec![TaskReport {
                task_id: 0,
                emitted: Some(emitted),
            }])
        }

        async fn teardown(
            &self,
            handle: &RunHandle,
            _grace: Duration,
        ) -> Result<(), ClientError> {
            self.torn_down.lock().unwrap().push(handle.name.clone());
            Err(ClientError::InstanceNotFound(handle.id.clone()))
        }
    }

    fn config(instances: usize) -> HarnessConfig {
        HarnessConfig {
            instances,
            local: true,
            poll_interval_secs: 1,
            duration_secs: 2,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_session_tears_down_every_instance() {
        let client = Arc::new(ScriptedClient::new());
        let mut session = Session::new(client.clone(), config(2));

        let outcome = session.run().await.unwrap();
        assert!(outcome.polls >= 1);
        assert_eq!(session.state(), SessionState::Done);
        assert_eq!(client.torn_down(), vec!["test-0", "test-1"]);
        assert!(session.handles().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_tears_down_only_started_instances() {
        let client = Arc::new(ScriptedClient::new().fail_submission(1));
        let mut session = Session::new(client.clone(), config(3));

        let result = session.run().await;
        match result {
            Err(BenchError::Submission { name, .. }) => assert_eq!(name, "test-1"),
            other => panic!("expected submission error, got {other:?}"),
        }
        // Only the first instance ever started, so only it is torn down
        assert_eq!(client.torn_down(), vec!["test-0"]);
        assert_eq!(session.state(), SessionState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_still_tears_down_all() {
        let client = Arc::new(ScriptedClient::new().fail_polls());
        let mut session = Session::new(client.clone(), config(2));

        let result = session.run().await;
        assert!(matches!(result, Err(BenchError::Client(_))));
        assert_eq!(client.torn_down(), vec!["test-0", "test-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_failures_do_not_mask_success() {
        // ScriptedClient always fails teardown with InstanceNotFound;
        // the session outcome must still be the measurement result.
        let client = Arc::new(ScriptedClient::new());
        let mut session = Session::new(client.clone(), config(1));

        assert!(session.run().await.is_ok());
        assert_eq!(client.torn_down(), vec!["test-0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_graph_shape_surfaces_as_config_error() {
        let client = Arc::new(ScriptedClient::new());
        let mut session = Session::new(
            client.clone(),
            HarnessConfig {
                levels: 0,
                ..config(1)
            },
        );

        let result = session.run().await;
        assert!(matches!(result, Err(BenchError::Config(_))));
        // Nothing was submitted, nothing to tear down
        assert!(client.torn_down().is_empty());
    }
}
