//! Consumer Error Types

use crate::consumer::state::LifecycleState;
use crate::core::error_handling::ContextualError;
use crate::pipeline::StageError;
use crate::queue::QueueError;

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// A required component was used before it existed
    #[error("{message}")]
    NotInitialized { message: String },

    #[error("Invalid consumer configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot {operation} a consumer that is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    /// Raised inside a worker when force stop was requested
    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Concurrency limiter was closed")]
    LimiterClosed,

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Worker {worker_id} panicked: {message}")]
    WorkerPanicked { worker_id: usize, message: String },

    #[error("Synchronization error: {message}")]
    SyncError { message: String },
}

impl ConsumerError {
    pub fn not_initialized(component: &str) -> Self {
        ConsumerError::NotInitialized {
            message: format!("{} is not initialized", component),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        ConsumerError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, ConsumerError::NotInitialized { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConsumerError::Cancelled { .. })
    }
}

impl ContextualError for ConsumerError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ConsumerError::NotInitialized { .. } | ConsumerError::InvalidConfig { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConsumerError::NotInitialized { message } | ConsumerError::InvalidConfig { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}

/// Result type for consumer operations
pub type ConsumerResult<T> = Result<T, ConsumerError>;
