//! Consumer configuration

use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::consumer::limiter::DEFAULT_LIMITER_CAPACITY;
use crate::metrics::MetricsSink;
use crate::pipeline::Pipeline;
use crate::queue::MessageQueue;
use std::sync::Arc;

pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Everything a consumer needs, fixed before `start()`
///
/// `queue` may be left empty; the consumer then refuses to start with
/// `NotInitialized`. `metrics` defaults to [`crate::metrics::LogMetricsSink`].
pub struct ConsumerConfig<T> {
    pub queue: Option<Arc<dyn MessageQueue<T>>>,
    pub pipeline: Pipeline<T>,
    pub limiter_capacity: usize,
    pub worker_count: usize,
    pub metrics: Option<Arc<dyn MetricsSink>>,
}

impl<T> Default for ConsumerConfig<T> {
    fn default() -> Self {
        Self {
            queue: None,
            pipeline: Pipeline::default(),
            limiter_capacity: DEFAULT_LIMITER_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            metrics: None,
        }
    }
}

impl<T> ConsumerConfig<T>
where
    T: Send + 'static,
{
    pub fn new(queue: Arc<dyn MessageQueue<T>>, pipeline: Pipeline<T>) -> Self {
        Self {
            queue: Some(queue),
            pipeline,
            ..Self::default()
        }
    }

    pub fn with_limiter_capacity(mut self, limiter_capacity: usize) -> Self {
        self.limiter_capacity = limiter_capacity;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reject counts that could never make progress
    pub fn validate(&self) -> ConsumerResult<()> {
        if self.worker_count == 0 {
            return Err(ConsumerError::invalid_config(
                "worker count must be at least 1",
            ));
        }
        if self.limiter_capacity == 0 {
            return Err(ConsumerError::invalid_config(
                "limiter capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ChannelQueue;

    #[test]
    fn test_defaults() {
        let config: ConsumerConfig<String> = ConsumerConfig::default();
        assert!(config.queue.is_none());
        assert_eq!(config.limiter_capacity, 3);
        assert_eq!(config.worker_count, 1);
        assert!(config.pipeline.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_counts_rejected() {
        let queue = ChannelQueue::<u32>::shared("cfg");
        let no_workers =
            ConsumerConfig::<u32>::new(queue.clone(), Pipeline::new()).with_worker_count(0);
        let no_permits =
            ConsumerConfig::<u32>::new(queue, Pipeline::new()).with_limiter_capacity(0);

        let err = no_workers.validate().unwrap_err();
        assert!(err.to_string().contains("worker count"));
        let err = no_permits.validate().unwrap_err();
        assert!(err.to_string().contains("limiter capacity"));
    }
}
