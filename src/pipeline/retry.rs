//! Opt-in retries for a single stage

use crate::core::retry::{retry_async, RetryPolicy};
use crate::pipeline::error::{StageError, StageResult};
use crate::pipeline::stage::Stage;
use async_trait::async_trait;
use std::sync::Arc;

/// Re-runs the wrapped stage on a copy of its input until it succeeds
///
/// When every attempt fails the last error is reported as
/// [`StageError::RetriesExhausted`].
pub struct RetryStage<T> {
    inner: Arc<dyn Stage<T>>,
    policy: RetryPolicy,
}

impl<T> RetryStage<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(inner: Arc<dyn Stage<T>>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn shared(inner: Arc<dyn Stage<T>>, policy: RetryPolicy) -> Arc<dyn Stage<T>> {
        Arc::new(Self::new(inner, policy))
    }
}

#[async_trait]
impl<T> Stage<T> for RetryStage<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn transform(&self, message: T) -> StageResult<T> {
        let attempts = self.policy.max_attempts;
        let inner = Arc::clone(&self.inner);

        retry_async(self.inner.name(), self.policy.clone(), move || {
            let inner = Arc::clone(&inner);
            let message = message.clone();
            async move { inner.transform(message).await }
        })
        .await
        .map_err(|error| match error {
            StageError::Failed { stage, message } => StageError::RetriesExhausted {
                stage,
                attempts,
                message,
            },
            other => other,
        })
    }
}
