//! Errors surfaced by the `taskgate` binary

use crate::core::error_handling::ContextualError;
use crate::queue::api::{ConfigError, QueueError};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad invocation the user can fix
    #[error("{0}")]
    Usage(String),

    #[error("{message}")]
    Config {
        path: PathBuf,
        message: String,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Scenario task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn config(path: PathBuf, source: ConfigError) -> Self {
        let message = format!(
            "Error in configuration file {}: {}",
            path.display(),
            source
        );
        AppError::Config {
            path,
            message,
            source,
        }
    }
}

impl ContextualError for AppError {
    fn is_user_actionable(&self) -> bool {
        self.user_message().is_some()
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AppError::Usage(message) => Some(message),
            AppError::Config { message, .. } => Some(message),
            AppError::Queue(QueueError::InvalidConfig { message }) => Some(message),
            _ => None,
        }
    }
}
