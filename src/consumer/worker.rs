//! Worker loop
//!
//! Every worker of a run executes the same loop against the same queue and
//! limiter:
//!
//! 1. loop-top: exit if force stop was requested or the run was stopped
//! 2. acquire a limiter permit
//! 3. pull one message
//! 4. run the pipeline
//! 5. drop the permit
//!
//! Cancellation is only observed at step 1. A worker suspended in step 2 or
//! step 3 stays there until a permit or a message arrives, so neither `stop()`
//! nor `force_stop()` bounds shutdown latency while the queue is empty.
//!
//! A stage error is not caught: the worker ends with `Err` and the pool runs
//! one worker short for the rest of the run.

use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::consumer::limiter::Limiter;
use crate::consumer::state::RunContext;
use crate::metrics::MetricsSink;
use crate::pipeline::Pipeline;
use crate::queue::MessageQueue;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a worker loop ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// `stop()` cleared the running flag
    Stopped { processed: u64 },
    /// `force_stop()` was observed at loop-top
    Cancelled { reason: String },
    /// The queue reported it is closed and drained
    QueueClosed { processed: u64 },
}

/// Running counters shared by all workers of a consumer
#[derive(Debug, Default)]
pub struct ConsumerStats {
    processed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    active_workers: AtomicUsize,
}

/// Point-in-time copy of [`ConsumerStats`] plus limiter gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub active_workers: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

impl ConsumerStats {
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, limiter: &Limiter) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            active_workers: self.active_workers(),
            in_flight: limiter.in_flight(),
            peak_in_flight: limiter.peak_in_flight(),
        }
    }
}

/// Counts a worker as active from spawn until its task ends, however it ends
///
/// Updates both the consumer-wide gauge and the live count of the worker's
/// own run.
pub(crate) struct ActiveWorkerGuard {
    stats: Arc<ConsumerStats>,
    run: Arc<RunContext>,
}

impl ActiveWorkerGuard {
    pub(crate) fn register(stats: &Arc<ConsumerStats>, run: &Arc<RunContext>) -> Self {
        stats.active_workers.fetch_add(1, Ordering::AcqRel);
        run.worker_spawned();
        Self {
            stats: Arc::clone(stats),
            run: Arc::clone(run),
        }
    }
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        self.run.worker_ended();
        self.stats.active_workers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Everything a worker shares with its siblings
pub(crate) struct WorkerContext<T> {
    pub(crate) queue: Arc<dyn MessageQueue<T>>,
    pub(crate) pipeline: Pipeline<T>,
    pub(crate) limiter: Arc<Limiter>,
    pub(crate) stats: Arc<ConsumerStats>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
}

impl<T> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            pipeline: self.pipeline.clone(),
            limiter: Arc::clone(&self.limiter),
            stats: Arc::clone(&self.stats),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Spawned worker task
#[derive(Debug)]
pub struct WorkerHandle {
    worker_id: usize,
    generation: u64,
    handle: JoinHandle<ConsumerResult<WorkerExit>>,
}

impl WorkerHandle {
    pub(crate) fn new(
        worker_id: usize,
        generation: u64,
        handle: JoinHandle<ConsumerResult<WorkerExit>>,
    ) -> Self {
        Self {
            worker_id,
            generation,
            handle,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Which `start()` spawned this worker (1 for the first run)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to end
    ///
    /// A stage error comes back as `Err(ConsumerError::Stage)`, a panic inside
    /// a stage as `Err(ConsumerError::WorkerPanicked)`.
    pub async fn join(self) -> ConsumerResult<WorkerExit> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_error) => Err(ConsumerError::WorkerPanicked {
                worker_id: self.worker_id,
                message: join_error.to_string(),
            }),
        }
    }
}

/// One acquire, pull, pipeline iteration
pub(crate) async fn consume_and_process<T>(context: &WorkerContext<T>) -> ConsumerResult<()>
where
    T: Send + 'static,
{
    let _permit = context.limiter.acquire().await?;
    let message = context.queue.pull().await?;
    context.pipeline.run(message).await?;
    context.stats.record_processed();
    Ok(())
}

async fn drive_loop<T>(
    worker_id: usize,
    run: &RunContext,
    context: &WorkerContext<T>,
    processed: &mut u64,
) -> ConsumerResult<WorkerExit>
where
    T: Send + 'static,
{
    loop {
        run.check_cancelled()?;
        if !run.is_running() {
            return Ok(WorkerExit::Stopped {
                processed: *processed,
            });
        }

        match consume_and_process(context).await {
            Ok(()) => *processed += 1,
            Err(ConsumerError::Queue(e)) if e.is_closed() => {
                log::debug!("Worker {}: {}", worker_id, e);
                return Ok(WorkerExit::QueueClosed {
                    processed: *processed,
                });
            }
            Err(e) => return Err(e),
        }
    }
}

/// Body of a worker task
pub(crate) async fn run_worker<T>(
    worker_id: usize,
    run: Arc<RunContext>,
    context: WorkerContext<T>,
    guard: ActiveWorkerGuard,
) -> ConsumerResult<WorkerExit>
where
    T: Send + 'static,
{
    let _guard = guard;
    let mut processed = 0;
    log::debug!(
        "Worker {} started (generation {})",
        worker_id,
        run.generation()
    );

    match drive_loop(worker_id, &run, &context, &mut processed).await {
        Ok(exit) => {
            log::debug!("Worker {} exited: {:?}", worker_id, exit);
            Ok(exit)
        }
        Err(ConsumerError::Cancelled { reason }) => {
            context.stats.record_cancelled();
            context
                .metrics
                .log(&format!("Worker {} cancelled: {}", worker_id, reason));
            Ok(WorkerExit::Cancelled { reason })
        }
        Err(e) => {
            context.stats.record_failed();
            log::error!(
                "Worker {} terminated after {} messages: {}",
                worker_id,
                processed,
                e
            );
            context
                .metrics
                .log(&format!("Worker {} failed: {}", worker_id, e));
            Err(e)
        }
    }
}
