//! JSON-over-HTTP cluster controller client
//!
//! Speaks a small REST surface: graph submission, a cluster snapshot, per-
//! stage task reports, and teardown with a grace period. The shapes on the
//! wire are the serde forms of the types in [`super`].

use super::{ClientError, ClusterClient, ClusterSnapshot, RunHandle, TaskReport, WorkerConfig};
use crate::topology::GraphSpec;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Client for a cluster controller's REST API
#[derive(Debug, Clone)]
pub struct ControllerClient {
    http: Client,
    base_url: String,
}

/// Graph submission payload
#[derive(Serialize)]
struct SubmitRequest<'a> {
    name: &'a str,
    #[serde(flatten)]
    graph: &'a GraphSpec,
    config: &'a WorkerConfig,
}

impl ControllerClient {
    /// Create a client for the controller at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Map a non-success response to a `ClientError`
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(ClientError::InstanceNotFound(message))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ClusterClient for ControllerClient {
    async fn submit(
        &self,
        name: &str,
        graph: &GraphSpec,
        config: &WorkerConfig,
    ) -> Result<RunHandle, ClientError> {
        let body = SubmitRequest {
            name,
            graph,
            config,
        };
        let response = self
            .http
            .post(self.url("graphs"))
            .json(&body)
            .send()
            .await?;
        let handle = Self::check(response).await?.json::<RunHandle>().await?;
        Ok(handle)
    }

    async fn cluster_snapshot(&self) -> Result<ClusterSnapshot, ClientError> {
        let response = self.http.get(self.url("cluster")).send().await?;
        let snapshot = Self::check(response)
            .await?
            .json::<ClusterSnapshot>()
            .await?;
        Ok(snapshot)
    }

    async fn task_reports(
        &self,
        instance_id: &str,
        stage: &str,
    ) -> Result<Vec<TaskReport>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("graphs/{instance_id}/stages/{stage}/tasks")))
            .send()
            .await?;
        let reports = Self::check(response)
            .await?
            .json::<Vec<TaskReport>>()
            .await?;
        Ok(reports)
    }

    async fn teardown(&self, handle: &RunHandle, grace: Duration) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("graphs/{}", handle.id)))
            .query(&[("grace_seconds", grace.as_secs())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
