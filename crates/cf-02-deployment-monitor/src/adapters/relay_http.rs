//! HTTP relay status client.

use crate::domain::RelayTaskStatus;
use crate::error::{RelayError, RelayResult};
use crate::ports::RelayClient;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use shared_types::{RelayTaskId, RelayTaskState, TxHash};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    task: TaskStatusBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskStatusBody {
    task_id: RelayTaskId,
    task_state: RelayTaskState,
    #[serde(default)]
    transaction_hash: Option<TxHash>,
}

impl From<TaskStatusBody> for RelayTaskStatus {
    fn from(body: TaskStatusBody) -> Self {
        Self {
            task_id: body.task_id,
            state: body.task_state,
            transaction_hash: body.transaction_hash,
        }
    }
}

/// Polls `GET {base}/tasks/status/{task_id}`; a 404 means the task is not known yet.
pub struct HttpRelayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpRelayClient {
    pub fn new(base_url: &str) -> RelayResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| RelayError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// Task ids are percent-encoded as a single path segment.
    fn status_url(&self, task_id: &RelayTaskId) -> RelayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RelayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["tasks", "status", task_id.0.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn get_task_status(&self, task_id: &RelayTaskId) -> RelayResult<Option<RelayTaskStatus>> {
        let response = self
            .http
            .get(self.status_url(task_id)?)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: TaskStatusResponse = response
                    .json()
                    .await
                    .map_err(|e| RelayError::Decode(e.to_string()))?;
                Ok(Some(body.task.into()))
            }
            status => Err(RelayError::Http {
                status: status.as_u16(),
            }),
        }
    }
}
