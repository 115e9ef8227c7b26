//! Ordered stage sequence

use crate::pipeline::error::StageResult;
use crate::pipeline::stage::{stage_fn, Stage};
use std::future::Future;
use std::sync::Arc;

/// Stages applied strictly in insertion order
///
/// Stage k+1 receives exactly what stage k returned. The first error stops
/// the run and is returned unchanged; later stages never see the message.
pub struct Pipeline<T> {
    stages: Vec<Arc<dyn Stage<T>>>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Pipeline<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an existing stage
    pub fn with_stage(mut self, stage: Arc<dyn Stage<T>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append an async closure as a named stage
    pub fn then<F, Fut>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult<T>> + Send + 'static,
    {
        self.with_stage(stage_fn(name, func))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Thread `message` through every stage
    ///
    /// An empty pipeline returns the message untouched.
    pub async fn run(&self, message: T) -> StageResult<T> {
        let mut current = message;
        for stage in &self.stages {
            log::trace!("Running stage '{}'", stage.name());
            current = stage.transform(current).await?;
        }
        Ok(current)
    }
}
