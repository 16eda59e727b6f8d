//! Queue Error Types

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Operation cancelled: the queue was cancelled")]
    Cancelled,

    #[error("Operation timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Invalid queue configuration: {message}")]
    InvalidConfig { message: String },
}

impl QueueError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        QueueError::InvalidConfig {
            message: message.into(),
        }
    }

    /// True when the error came from a queue cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueueError::Cancelled)
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
