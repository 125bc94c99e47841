use thiserror::Error;

use crate::models::TaskId;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Stale response discarded for task {task_id} (seq {seq})")]
    StaleResponseDiscarded { task_id: TaskId, seq: u64 },

    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Transport failures and unreadable responses both surface as a fetch failure.
    pub fn is_fetch(&self) -> bool {
        matches!(self, AppError::Fetch(_) | AppError::Decode(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Decode(e.to_string())
        } else {
            AppError::Fetch(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decode(e.to_string())
    }
}
