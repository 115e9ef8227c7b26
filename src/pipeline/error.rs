//! Stage Error Types

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("Stage '{stage}' failed: {message}")]
    Failed { stage: String, message: String },

    #[error("Stage '{stage}' gave up after {attempts} attempts: {message}")]
    RetriesExhausted {
        stage: String,
        attempts: usize,
        message: String,
    },
}

impl StageError {
    pub fn failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StageError::Failed {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Name of the stage that raised the error
    pub fn stage(&self) -> &str {
        match self {
            StageError::Failed { stage, .. } | StageError::RetriesExhausted { stage, .. } => stage,
        }
    }
}

/// Result type for stage transforms
pub type StageResult<T> = Result<T, StageError>;
