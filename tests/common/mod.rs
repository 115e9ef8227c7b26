//! Common test utilities shared by the integration suites

#![allow(dead_code)]

use msgpipe::consumer::{Consumer, ConsumerConfig, ConsumerResult, WorkerExit, WorkerHandle};
use msgpipe::metrics::{MemoryMetricsSink, MetricsSink};
use msgpipe::pipeline::Pipeline;
use msgpipe::queue::MessageQueue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// Consumer wired to an in-memory metrics sink
pub fn consumer_with_memory_metrics<T>(
    queue: Arc<dyn MessageQueue<T>>,
    pipeline: Pipeline<T>,
    workers: usize,
    limit: usize,
) -> (Consumer<T>, Arc<MemoryMetricsSink>)
where
    T: Send + 'static,
{
    let metrics = Arc::new(MemoryMetricsSink::new());
    let consumer = Consumer::new(
        ConsumerConfig::new(queue, pipeline)
            .with_worker_count(workers)
            .with_limiter_capacity(limit)
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>),
    )
    .expect("valid consumer config");
    (consumer, metrics)
}

/// Poll until `condition` holds, giving up after three seconds
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Join every worker with a timeout so a hung worker fails the test
pub async fn join_workers(handles: Vec<WorkerHandle>) -> Vec<ConsumerResult<WorkerExit>> {
    let mut results = Vec::new();
    for handle in handles {
        results.push(within(handle.join()).await);
    }
    results
}

pub async fn within<F: Future>(future: F) -> F::Output {
    timeout(Duration::from_secs(3), future)
        .await
        .expect("operation timed out")
}
