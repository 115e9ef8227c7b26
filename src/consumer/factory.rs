//! Ready-made consumers for the driver and demos
//!
//! Each factory only fills in a [`ConsumerConfig`]; the result is the same
//! generic [`Consumer`] anyone could build by hand.

use crate::consumer::config::ConsumerConfig;
use crate::consumer::error::ConsumerResult;
use crate::consumer::pool::Consumer;
use crate::http::HttpPollRequest;
use crate::metrics::MetricsSink;
use crate::pipeline::Pipeline;
use crate::queue::{MessageQueue, StubQueue};
use std::sync::Arc;
use std::time::Duration;

pub const STUB_CONSUMER_WORKERS: usize = 5;
pub const STUB_CONSUMER_LIMIT: usize = 3;
pub const CHANNEL_CONSUMER_WORKERS: usize = 5;
pub const CHANNEL_CONSUMER_LIMIT: usize = 5;
pub const HTTP_CONSUMER_WORKERS: usize = 3;
pub const HTTP_CONSUMER_LIMIT: usize = 10;

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Two stages: uppercase the text, then log it
///
/// Each stage waits `stage_delay` first to stand in for real work.
pub fn text_pipeline(stage_delay: Duration) -> Pipeline<String> {
    Pipeline::new()
        .then("uppercase", move |message: String| async move {
            pause(stage_delay).await;
            Ok(message.to_uppercase())
        })
        .then("log", move |message: String| async move {
            pause(stage_delay).await;
            log::info!("Processed message: {}", message);
            Ok(message)
        })
}

/// Single stage that logs each request it would issue
pub fn http_pipeline(stage_delay: Duration) -> Pipeline<HttpPollRequest> {
    Pipeline::new().then("log-request", move |request: HttpPollRequest| async move {
        log::info!("Processing request to {}", request.url);
        pause(stage_delay).await;
        Ok(request)
    })
}

/// Text consumer fed by a [`StubQueue`] that always yields "Default Message"
pub fn default_stub_consumer(
    stage_delay: Duration,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> ConsumerResult<(Consumer<String>, Arc<StubQueue<String>>)> {
    let queue = Arc::new(StubQueue::default_text().with_pull_delay(stage_delay));
    let mut config = ConsumerConfig::new(
        Arc::clone(&queue) as Arc<dyn MessageQueue<String>>,
        text_pipeline(stage_delay),
    )
    .with_worker_count(STUB_CONSUMER_WORKERS)
    .with_limiter_capacity(STUB_CONSUMER_LIMIT);
    config.metrics = metrics;

    Ok((Consumer::new(config)?, queue))
}

/// Text consumer over any shared queue
pub fn channel_text_consumer(
    queue: Arc<dyn MessageQueue<String>>,
    stage_delay: Duration,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> ConsumerResult<Consumer<String>> {
    let mut config = ConsumerConfig::new(queue, text_pipeline(stage_delay))
        .with_worker_count(CHANNEL_CONSUMER_WORKERS)
        .with_limiter_capacity(CHANNEL_CONSUMER_LIMIT);
    config.metrics = metrics;
    Consumer::new(config)
}

/// Consumer for [`HttpPollRequest`] messages
pub fn http_call_consumer(
    queue: Arc<dyn MessageQueue<HttpPollRequest>>,
    stage_delay: Duration,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> ConsumerResult<Consumer<HttpPollRequest>> {
    let mut config = ConsumerConfig::new(queue, http_pipeline(stage_delay))
        .with_worker_count(HTTP_CONSUMER_WORKERS)
        .with_limiter_capacity(HTTP_CONSUMER_LIMIT);
    config.metrics = metrics;
    Consumer::new(config)
}
