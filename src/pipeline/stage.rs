//! A single transform step

use crate::pipeline::error::StageResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// One step of a pipeline: takes a message, returns a (possibly changed) one
///
/// Stages may await and may perform side effects. An `Err` abandons the rest
/// of the pipeline for that message.
#[async_trait]
pub trait Stage<T>: Send + Sync
where
    T: Send + 'static,
{
    fn name(&self) -> &str;

    async fn transform(&self, message: T) -> StageResult<T>;
}

/// Stage backed by an async closure
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<T, F, Fut> Stage<T> for FnStage<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult<T>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&self, message: T) -> StageResult<T> {
        (self.func)(message).await
    }
}

/// Wrap an async closure as a shareable stage
///
/// # Example
///
/// ```rust
/// use msgpipe::pipeline::{stage_fn, Stage};
///
/// # async fn example() {
/// let upper = stage_fn("uppercase", |message: String| async move { Ok(message.to_uppercase()) });
/// assert_eq!(upper.transform("ab".to_string()).await.unwrap(), "AB");
/// # }
/// ```
pub fn stage_fn<T, F, Fut>(name: impl Into<String>, func: F) -> Arc<dyn Stage<T>>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult<T>> + Send + 'static,
{
    Arc::new(FnStage::new(name, func))
}
