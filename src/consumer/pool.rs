//! Consumer: owns the lifecycle and the worker pool
//!
//! `start`, `stop` and `force_stop` are signal-only. None of them waits for
//! workers to finish; callers that need drain completion take the handles with
//! [`Consumer::take_workers`] before stopping and await them.

use crate::consumer::config::ConsumerConfig;
use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::consumer::limiter::Limiter;
use crate::consumer::state::{LifecycleState, RunContext};
use crate::consumer::worker::{
    consume_and_process, run_worker, ActiveWorkerGuard, ConsumerStats, StatsSnapshot,
    WorkerContext, WorkerHandle,
};
use crate::metrics::{LogMetricsSink, MetricsSink};
use crate::pipeline::Pipeline;
use crate::queue::MessageQueue;
use std::sync::Arc;

/// Pulls messages from a queue and runs them through a pipeline on a pool of
/// concurrent workers, with at most `limiter_capacity` messages in flight
///
/// # Example
///
/// ```rust
/// use msgpipe::consumer::{Consumer, ConsumerConfig};
/// use msgpipe::pipeline::Pipeline;
/// use msgpipe::queue::{ChannelQueue, MessageQueue};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = ChannelQueue::<String>::shared("jobs");
/// let pipeline = Pipeline::new().then("uppercase", |m: String| async move { Ok(m.to_uppercase()) });
///
/// let mut consumer = Consumer::new(
///     ConsumerConfig::new(queue.clone() as Arc<dyn MessageQueue<String>>, pipeline)
///         .with_worker_count(2),
/// )?;
/// consumer.start()?;
/// queue.push("hello".to_string());
/// consumer.stop();
/// # Ok(())
/// # }
/// ```
pub struct Consumer<T> {
    queue: Option<Arc<dyn MessageQueue<T>>>,
    pipeline: Pipeline<T>,
    worker_count: usize,
    limiter: Arc<Limiter>,
    metrics: Arc<dyn MetricsSink>,
    stats: Arc<ConsumerStats>,
    state: LifecycleState,
    run: Option<Arc<RunContext>>,
    workers: Vec<WorkerHandle>,
    generation: u64,
}

impl<T> Consumer<T>
where
    T: Send + 'static,
{
    /// Build an idle consumer; invalid counts are rejected here
    pub fn new(config: ConsumerConfig<T>) -> ConsumerResult<Self> {
        config.validate()?;
        let limiter = Arc::new(Limiter::new(config.limiter_capacity)?);
        let metrics = config
            .metrics
            .unwrap_or_else(|| Arc::new(LogMetricsSink) as Arc<dyn MetricsSink>);

        Ok(Self {
            queue: config.queue,
            pipeline: config.pipeline,
            worker_count: config.worker_count,
            limiter,
            metrics,
            stats: Arc::new(ConsumerStats::default()),
            state: LifecycleState::Idle,
            run: None,
            workers: Vec::new(),
            generation: 0,
        })
    }

    /// Spawn a fresh generation of `worker_count` workers
    ///
    /// Calling this while already running does nothing. Must be called from
    /// inside a tokio runtime.
    pub fn start(&mut self) -> ConsumerResult<()> {
        let state = self.state();
        if state == LifecycleState::Running {
            log::debug!("Consumer already running; start ignored");
            return Ok(());
        }
        if !state.can_start() {
            return Err(ConsumerError::InvalidTransition {
                operation: "start",
                state,
            });
        }

        let queue = self
            .queue
            .clone()
            .ok_or_else(|| ConsumerError::not_initialized("message queue"))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ConsumerError::not_initialized("tokio runtime"))?;

        self.generation += 1;
        let run = Arc::new(RunContext::new(self.generation));
        let context = WorkerContext {
            queue,
            pipeline: self.pipeline.clone(),
            limiter: Arc::clone(&self.limiter),
            stats: Arc::clone(&self.stats),
            metrics: Arc::clone(&self.metrics),
        };

        self.workers = (0..self.worker_count)
            .map(|worker_id| {
                let guard = ActiveWorkerGuard::register(&self.stats, &run);
                let handle = runtime.spawn(run_worker(
                    worker_id,
                    Arc::clone(&run),
                    context.clone(),
                    guard,
                ));
                WorkerHandle::new(worker_id, self.generation, handle)
            })
            .collect();

        self.run = Some(run);
        self.state = LifecycleState::Running;
        self.metrics.log(&format!(
            "Consumer started with {} workers",
            self.worker_count
        ));
        Ok(())
    }

    /// Graceful stop
    ///
    /// Clears the running flag and forgets the worker handles. Each worker
    /// finishes its current message and exits at its next loop-top check; a
    /// worker waiting on an empty queue or a full limiter stays suspended until
    /// it gets a message or permit, then processes it and exits.
    pub fn stop(&mut self) {
        if let Some(run) = &self.run {
            run.halt();
        }
        if matches!(self.state, LifecycleState::Idle | LifecycleState::Stopped) {
            return;
        }

        let dropped = self.workers.len();
        self.workers.clear();
        self.state = LifecycleState::Stopped;
        log::info!("Consumer stopped ({} worker handles released)", dropped);
        self.metrics.log("Consumer stopped");
    }

    /// Request cancellation of the current run
    ///
    /// Workers observe it at their next loop-top check and exit as
    /// `WorkerExit::Cancelled`. Workers suspended inside acquire or pull are
    /// not interrupted. Fails with `NotInitialized` before the first `start()`.
    pub fn force_stop(&mut self, reason: &str) -> ConsumerResult<()> {
        let run = self
            .run
            .as_ref()
            .ok_or_else(|| ConsumerError::not_initialized("cancellation context"))?;
        run.cancel(reason)?;

        if self.state == LifecycleState::Running {
            self.state = LifecycleState::Stopping;
        }
        self.metrics
            .log(&format!("Consumer force stopped: {}", reason));
        Ok(())
    }

    /// Current lifecycle state
    ///
    /// A force-stopped consumer reports `Stopped` once every worker of the
    /// current run is gone. Stragglers of earlier runs do not count.
    pub fn state(&self) -> LifecycleState {
        let drained = self.run.as_ref().map_or(true, |run| run.live_workers() == 0);
        if self.state == LifecycleState::Stopping && drained {
            return LifecycleState::Stopped;
        }
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Hand the tracked worker handles to the caller
    pub fn take_workers(&mut self) -> Vec<WorkerHandle> {
        std::mem::take(&mut self.workers)
    }

    /// Run one iteration on the caller's task, outside the pool
    ///
    /// Needs a run context, so it fails with `NotInitialized` before
    /// `start()`; after force stop it fails with `Cancelled`.
    pub async fn process_next(&self) -> ConsumerResult<()> {
        let run = self
            .run
            .as_ref()
            .ok_or_else(|| ConsumerError::not_initialized("cancellation context"))?;
        run.check_cancelled()?;

        let queue = self
            .queue
            .clone()
            .ok_or_else(|| ConsumerError::not_initialized("message queue"))?;
        let context = WorkerContext {
            queue,
            pipeline: self.pipeline.clone(),
            limiter: Arc::clone(&self.limiter),
            stats: Arc::clone(&self.stats),
            metrics: Arc::clone(&self.metrics),
        };
        consume_and_process(&context).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(&self.limiter)
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Worker tasks alive across all generations
    pub fn active_workers(&self) -> usize {
        self.stats.active_workers()
    }

    /// Number of times `start()` spawned workers
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.halt();
        }
    }
}
