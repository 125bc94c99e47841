pub mod dto;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{Task, TaskId, TaskStatus};

/// The task retrieval API the board is built on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn update_task_status(&self, id: &TaskId, status: TaskStatus) -> Result<Option<Task>, AppError>;
}

/// [`TaskApi`] over HTTP, with an optional bearer token.
pub struct TaskHttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl TaskHttpClient {
    /// Client for `config.api_base_url`, sending `config.api_token` when set.
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    // A body that cannot be read in full is a transport failure, never an empty reply.
    async fn read_success(response: Response) -> Result<String, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Fetch(format!("Task API error {}: {}", status, body)));
        }
        response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to read task API response: {}", e)))
    }
}

#[async_trait]
impl TaskApi for TaskHttpClient {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, AppError> {
        let url = format!("{}/tasks", self.base_url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let body = Self::read_success(response).await?;

        let tasks: Vec<Task> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse task list: {}", e);
            AppError::Decode(format!("Failed to parse task list: {}", e))
        })?;
        tracing::debug!("Fetched {} tasks", tasks.len());
        Ok(tasks)
    }

    async fn update_task_status(&self, id: &TaskId, status: TaskStatus) -> Result<Option<Task>, AppError> {
        let url = format!("{}/tasks/{}", self.base_url, id);
        let request_body = dto::UpdateStatusRequest { status };

        let response = self
            .authorized(self.client.patch(&url))
            .json(&request_body)
            .send()
            .await?;
        let body = Self::read_success(response).await?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        let parsed: dto::UpdateTaskResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Decode(format!("Failed to parse update response: {}", e)))?;
        Ok(parsed.into_task())
    }
}

/// Serves an empty board and accepts every move without a round trip.
pub struct NoopTaskApi;

#[async_trait]
impl TaskApi for NoopTaskApi {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, AppError> {
        Ok(Vec::new())
    }

    async fn update_task_status(&self, _id: &TaskId, _status: TaskStatus) -> Result<Option<Task>, AppError> {
        Ok(None)
    }
}
