//! Test suites for the consumer execution model
//!
//! Grouped by concern: lifecycle transitions, failure semantics, and
//! behaviour under concurrency.

mod lifecycle;

use crate::consumer::{Consumer, ConsumerConfig, ConsumerResult, WorkerExit, WorkerHandle};
use crate::metrics::{MemoryMetricsSink, MetricsSink};
use crate::pipeline::Pipeline;
use crate::queue::MessageQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// Build a consumer reporting into an in-memory metrics sink
pub(super) fn build_consumer<T>(
    queue: Arc<dyn MessageQueue<T>>,
    pipeline: Pipeline<T>,
    workers: usize,
    limit: usize,
) -> (Consumer<T>, Arc<MemoryMetricsSink>)
where
    T: Send + 'static,
{
    let metrics = Arc::new(MemoryMetricsSink::new());
    let config = ConsumerConfig::new(queue, pipeline)
        .with_worker_count(workers)
        .with_limiter_capacity(limit)
        .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>);
    let consumer = Consumer::new(config).expect("valid consumer config");
    (consumer, metrics)
}

/// Poll `condition` until it holds or two seconds pass
pub(super) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(2)).await;
    }
    condition()
}

/// Await every handle, failing the test if any worker hangs
pub(super) async fn join_all(handles: Vec<WorkerHandle>) -> Vec<ConsumerResult<WorkerExit>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("worker did not exit in time");
        results.push(result);
    }
    results
}
