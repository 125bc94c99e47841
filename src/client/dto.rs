use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskStatus};

#[derive(Debug, Serialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// Body of a `PATCH /tasks/{id}` response. Older servers only acknowledge.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpdateTaskResponse {
    Task(Task),
    Ack {
        #[serde(default)]
        message: Option<String>,
    },
}

impl UpdateTaskResponse {
    /// The updated task, or `None` for a bare acknowledgement.
    pub fn into_task(self) -> Option<Task> {
        match self {
            UpdateTaskResponse::Task(task) => Some(task),
            UpdateTaskResponse::Ack { .. } => None,
        }
    }
}
