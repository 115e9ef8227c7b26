//! Demo driver: producers on a timer feeding one consumer
//!
//! The run has three phases:
//!
//! 1. start the consumer and spawn the producers
//! 2. wait for the run period (or a shutdown signal), then `stop()`
//! 3. give workers the grace period to drain; if any remain, `force_stop()`
//!
//! Workers parked on an empty queue ignore both stop flavours, so the driver
//! closes channel queues after stopping to release them.

use crate::app::args::{DriverMode, DriverSettings};
use crate::consumer::{
    http_pipeline, text_pipeline, Consumer, ConsumerConfig, ConsumerError, ConsumerResult,
    StatsSnapshot, WorkerExit, CHANNEL_CONSUMER_LIMIT, CHANNEL_CONSUMER_WORKERS,
    HTTP_CONSUMER_LIMIT, HTTP_CONSUMER_WORKERS, STUB_CONSUMER_LIMIT, STUB_CONSUMER_WORKERS,
};
use crate::core::shutdown::ShutdownCoordinator;
use crate::http::HttpPollRequest;
use crate::metrics::{LogMetricsSink, MetricsSink};
use crate::pipeline::Pipeline;
use crate::queue::{ChannelQueue, MessageQueue, Producer, StubQueue};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Outcome of one driver run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub produced: u64,
    pub stats: StatsSnapshot,
    pub stopped_workers: usize,
    pub cancelled_workers: usize,
    pub closed_workers: usize,
    pub failed_workers: usize,
    /// Some workers were still running when the grace period ended
    pub forced: bool,
    pub interrupted: bool,
}

/// Builds the message producer `p` pushes as its `i`th message
type MessageFactory<T> = Arc<dyn Fn(usize, usize) -> T + Send + Sync>;

struct DriverPlan<T> {
    consumer: Consumer<T>,
    queue: Arc<dyn MessageQueue<T>>,
    make_message: MessageFactory<T>,
    close_queue: Option<Box<dyn FnOnce() + Send>>,
}

fn consumer_config<T>(
    queue: Arc<dyn MessageQueue<T>>,
    pipeline: Pipeline<T>,
    settings: &DriverSettings,
    default_workers: usize,
    default_limit: usize,
    metrics: Arc<dyn MetricsSink>,
) -> ConsumerConfig<T>
where
    T: Send + 'static,
{
    ConsumerConfig::new(queue, pipeline)
        .with_worker_count(settings.workers.unwrap_or(default_workers))
        .with_limiter_capacity(settings.limit.unwrap_or(default_limit))
        .with_metrics(metrics)
}

fn text_plan(
    settings: &DriverSettings,
    metrics: Arc<dyn MetricsSink>,
) -> ConsumerResult<DriverPlan<String>> {
    let channel = ChannelQueue::<String>::shared("text");
    let queue = Arc::clone(&channel) as Arc<dyn MessageQueue<String>>;
    let consumer = Consumer::new(consumer_config(
        Arc::clone(&queue),
        text_pipeline(settings.stage_delay),
        settings,
        CHANNEL_CONSUMER_WORKERS,
        CHANNEL_CONSUMER_LIMIT,
        metrics,
    ))?;

    Ok(DriverPlan {
        consumer,
        queue,
        make_message: Arc::new(|p, i| format!("message {} from producer {}", i, p)),
        close_queue: Some(Box::new(move || channel.close())),
    })
}

fn stub_plan(
    settings: &DriverSettings,
    metrics: Arc<dyn MetricsSink>,
) -> ConsumerResult<DriverPlan<String>> {
    let queue = Arc::new(StubQueue::default_text().with_pull_delay(settings.stage_delay))
        as Arc<dyn MessageQueue<String>>;
    let consumer = Consumer::new(consumer_config(
        Arc::clone(&queue),
        text_pipeline(settings.stage_delay),
        settings,
        STUB_CONSUMER_WORKERS,
        STUB_CONSUMER_LIMIT,
        metrics,
    ))?;

    Ok(DriverPlan {
        consumer,
        queue,
        make_message: Arc::new(|p, i| format!("message {} from producer {}", i, p)),
        close_queue: None,
    })
}

fn http_plan(
    settings: &DriverSettings,
    metrics: Arc<dyn MetricsSink>,
) -> ConsumerResult<DriverPlan<HttpPollRequest>> {
    let channel = ChannelQueue::<HttpPollRequest>::shared("http");
    let queue = Arc::clone(&channel) as Arc<dyn MessageQueue<HttpPollRequest>>;
    let consumer = Consumer::new(consumer_config(
        Arc::clone(&queue),
        http_pipeline(settings.stage_delay),
        settings,
        HTTP_CONSUMER_WORKERS,
        HTTP_CONSUMER_LIMIT,
        metrics,
    ))?;

    let requests = Arc::new(settings.requests.clone());
    let make_message: MessageFactory<HttpPollRequest> = Arc::new(move |p, i| {
        if requests.is_empty() {
            HttpPollRequest::get(format!("https://example.com/poll/{}/{}", p, i))
        } else {
            requests[(p + i) % requests.len()].clone()
        }
    });

    Ok(DriverPlan {
        consumer,
        queue,
        make_message,
        close_queue: Some(Box::new(move || channel.close())),
    })
}

/// Run the driver for the configured mode, reporting into `metrics`
pub async fn run_driver(
    settings: &DriverSettings,
    shutdown: &ShutdownCoordinator,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> ConsumerResult<DriverReport> {
    let metrics = metrics.unwrap_or_else(|| Arc::new(LogMetricsSink) as Arc<dyn MetricsSink>);
    log::info!(
        "Driver starting in {} mode: {} producers x {} messages",
        settings.mode,
        settings.producers,
        settings.messages_per_producer
    );

    match settings.mode {
        DriverMode::Text => drive(text_plan(settings, metrics)?, settings, shutdown).await,
        DriverMode::Stub => drive(stub_plan(settings, metrics)?, settings, shutdown).await,
        DriverMode::Http => drive(http_plan(settings, metrics)?, settings, shutdown).await,
    }
}

/// Each producer stays shared with the driver so its count survives an abort
fn spawn_producers<T>(
    queue: &Arc<dyn MessageQueue<T>>,
    make_message: &MessageFactory<T>,
    settings: &DriverSettings,
    shutdown: &ShutdownCoordinator,
) -> Vec<(Arc<Producer<T>>, JoinHandle<()>)>
where
    T: Send + 'static,
{
    (0..settings.producers)
        .map(|p| {
            let producer = Arc::new(Producer::new(format!("producer-{}", p), Arc::clone(queue)));
            let make_message = Arc::clone(make_message);
            let shutdown = shutdown.clone();
            let messages = settings.messages_per_producer;
            let interval = settings.interval;

            let task = tokio::spawn({
                let producer = Arc::clone(&producer);
                async move {
                    for i in 0..messages {
                        if shutdown.is_shutdown_requested() {
                            break;
                        }
                        if producer.produce(make_message(p, i)) {
                            log::debug!("{} pushed message {}", producer.producer_id(), i);
                        }
                        if i + 1 < messages {
                            sleep(interval).await;
                        }
                    }
                }
            });
            (producer, task)
        })
        .collect()
}

async fn drive<T>(
    plan: DriverPlan<T>,
    settings: &DriverSettings,
    shutdown: &ShutdownCoordinator,
) -> ConsumerResult<DriverReport>
where
    T: Send + 'static,
{
    let DriverPlan {
        mut consumer,
        queue,
        make_message,
        close_queue,
    } = plan;
    let mut report = DriverReport::default();
    let mut shutdown_rx = shutdown.subscribe();

    consumer.start()?;
    let producers = spawn_producers(&queue, &make_message, settings, shutdown);

    if shutdown.is_shutdown_requested() {
        report.interrupted = true;
    } else {
        tokio::select! {
            _ = sleep(settings.run_for) => {
                log::info!("Run period of {:?} elapsed; stopping consumer", settings.run_for);
            }
            _ = shutdown_rx.recv() => {
                log::info!("Shutdown requested; stopping consumer");
                report.interrupted = true;
            }
        }
    }

    let workers = consumer.take_workers();
    consumer.stop();
    for (_, task) in &producers {
        task.abort();
    }
    for (producer, task) in producers {
        let _ = task.await;
        report.produced += producer.produced_count();
    }
    if let Some(close) = close_queue {
        close();
    }

    let joins = join_all(workers.into_iter().map(|worker| worker.join()));
    match timeout(settings.grace, joins).await {
        Ok(results) => {
            for result in results {
                match result {
                    Ok(WorkerExit::Stopped { .. }) => report.stopped_workers += 1,
                    Ok(WorkerExit::Cancelled { .. }) => report.cancelled_workers += 1,
                    Ok(WorkerExit::QueueClosed { .. }) => report.closed_workers += 1,
                    Err(ConsumerError::Stage(e)) => {
                        log::warn!("Worker ended with stage error: {}", e);
                        report.failed_workers += 1;
                    }
                    Err(e) => {
                        log::warn!("Worker ended abnormally: {}", e);
                        report.failed_workers += 1;
                    }
                }
            }
        }
        Err(_) => {
            let reason = format!("grace period of {:?} elapsed", settings.grace);
            log::warn!(
                "{} workers still busy after stop; forcing",
                consumer.active_workers()
            );
            consumer.force_stop(&reason)?;
            report.forced = true;
        }
    }

    report.stats = consumer.stats();
    Ok(report)
}
