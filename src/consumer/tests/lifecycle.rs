//! Start, stop and force stop transitions

#[cfg(test)]
mod tests {
    use super::super::{build_consumer, join_all, wait_until};
    use crate::consumer::{
        Consumer, ConsumerConfig, ConsumerError, LifecycleState, WorkerExit,
    };
    use crate::pipeline::Pipeline;
    use crate::queue::{ChannelQueue, MessageQueue, StubQueue};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn passthrough() -> Pipeline<String> {
        Pipeline::new().then("identity", |m: String| async move { Ok(m) })
    }

    #[tokio::test]
    async fn test_start_spawns_exactly_k_workers() {
        let queue = ChannelQueue::<String>::shared("k-workers");
        let (mut consumer, metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            4,
            2,
        );

        consumer.start().unwrap();

        assert_eq!(consumer.state(), LifecycleState::Running);
        assert_eq!(consumer.active_workers(), 4);
        assert!(metrics.contains("Consumer started with 4 workers"));

        let handles = consumer.take_workers();
        assert_eq!(handles.len(), 4);
        assert!(handles.iter().all(|h| h.generation() == 1));

        queue.close();
        for result in join_all(handles).await {
            assert_eq!(result.unwrap(), WorkerExit::QueueClosed { processed: 0 });
        }
        assert_eq!(consumer.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_start_while_running_is_noop() {
        let queue = ChannelQueue::<String>::shared("idempotent");
        let (mut consumer, metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            2,
            2,
        );

        consumer.start().unwrap();
        consumer.start().unwrap();

        assert_eq!(consumer.generation(), 1);
        assert_eq!(consumer.active_workers(), 2);
        let started = metrics
            .lines()
            .iter()
            .filter(|line| line.starts_with("Consumer started"))
            .count();
        assert_eq!(started, 1);

        let handles = consumer.take_workers();
        queue.close();
        join_all(handles).await;
    }

    #[tokio::test]
    async fn test_start_without_queue_fails_fast() {
        let mut consumer = Consumer::new(ConsumerConfig::<String>::default()).unwrap();

        let err = consumer.start().unwrap_err();

        assert!(err.is_not_initialized());
        assert_eq!(err.to_string(), "message queue is not initialized");
        assert_eq!(consumer.state(), LifecycleState::Idle);
        assert_eq!(consumer.active_workers(), 0);
    }

    #[test]
    fn test_start_outside_runtime_fails_fast() {
        let queue = ChannelQueue::<String>::shared("no-runtime");
        let (mut consumer, _metrics) =
            build_consumer(queue as Arc<dyn MessageQueue<String>>, passthrough(), 1, 1);

        let err = consumer.start().unwrap_err();

        assert_eq!(err.to_string(), "tokio runtime is not initialized");
        assert_eq!(consumer.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_force_stop_before_start_fails_fast() {
        let queue = ChannelQueue::<String>::shared("early");
        let (mut consumer, metrics) =
            build_consumer(queue as Arc<dyn MessageQueue<String>>, passthrough(), 1, 1);

        let err = consumer.force_stop("too soon").unwrap_err();

        assert_eq!(err.to_string(), "cancellation context is not initialized");
        assert_eq!(consumer.state(), LifecycleState::Idle);
        assert!(metrics.lines().is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let queue = ChannelQueue::<String>::shared("idle-stop");
        let (mut consumer, metrics) =
            build_consumer(queue as Arc<dyn MessageQueue<String>>, passthrough(), 1, 1);

        consumer.stop();

        assert_eq!(consumer.state(), LifecycleState::Idle);
        assert!(metrics.lines().is_empty());
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_message_finish() {
        let queue = ChannelQueue::<String>::shared("drain");
        let started = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(Mutex::new(Vec::new()));

        let pipeline = {
            let started = Arc::clone(&started);
            let completed = Arc::clone(&completed);
            Pipeline::new()
                .then("slow", move |m: String| {
                    let started = Arc::clone(&started);
                    async move {
                        started.store(true, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(m)
                    }
                })
                .then("record", move |m: String| {
                    let completed = Arc::clone(&completed);
                    async move {
                        completed.lock().unwrap().push(m.clone());
                        Ok(m)
                    }
                })
        };

        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            pipeline,
            1,
            1,
        );
        queue.push("only".to_string());
        consumer.start().unwrap();
        let handles = consumer.take_workers();

        assert!(wait_until(|| started.load(Ordering::SeqCst)).await);
        consumer.stop();
        assert_eq!(consumer.state(), LifecycleState::Stopped);

        let results = join_all(handles).await;

        assert_eq!(results[0].as_ref().unwrap(), &WorkerExit::Stopped { processed: 1 });
        assert_eq!(*completed.lock().unwrap(), vec!["only".to_string()]);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_force_stop_cancels_and_logs_reason() {
        let queue = Arc::new(
            StubQueue::<String>::default_text().with_pull_delay(Duration::from_millis(5)),
        );
        let (mut consumer, metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            2,
            2,
        );

        consumer.start().unwrap();
        let handles = consumer.take_workers();
        assert!(wait_until(|| consumer.stats().processed >= 2).await);

        consumer.force_stop("deadline reached").unwrap();
        assert!(matches!(
            consumer.state(),
            LifecycleState::Stopping | LifecycleState::Stopped
        ));

        for result in join_all(handles).await {
            assert_eq!(
                result.unwrap(),
                WorkerExit::Cancelled {
                    reason: "deadline reached".to_string()
                }
            );
        }

        assert_eq!(consumer.state(), LifecycleState::Stopped);
        assert_eq!(consumer.stats().cancelled, 2);
        assert!(metrics.contains("Consumer force stopped: deadline reached"));
        assert!(metrics.contains("Worker 0 cancelled: deadline reached"));
        assert!(metrics.contains("Worker 1 cancelled: deadline reached"));
    }

    #[tokio::test]
    async fn test_force_stop_does_not_interrupt_blocked_pull() {
        let queue = ChannelQueue::<String>::shared("blocked");
        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            1,
            1,
        );

        consumer.start().unwrap();
        let handles = consumer.take_workers();
        tokio::time::sleep(Duration::from_millis(20)).await;

        consumer.force_stop("shutdown").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!handles[0].is_finished());
        assert_eq!(consumer.state(), LifecycleState::Stopping);
        assert!(matches!(
            consumer.start(),
            Err(ConsumerError::InvalidTransition {
                operation: "start",
                state: LifecycleState::Stopping
            })
        ));

        // The pulled message is processed, then cancellation is observed
        queue.push("wake".to_string());
        let results = join_all(handles).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::Cancelled {
                reason: "shutdown".to_string()
            }
        );
        assert_eq!(consumer.stats().processed, 1);
        assert_eq!(consumer.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_does_not_interrupt_blocked_pull() {
        let queue = ChannelQueue::<String>::shared("blocked-stop");
        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            1,
            1,
        );

        consumer.start().unwrap();
        let handles = consumer.take_workers();
        tokio::time::sleep(Duration::from_millis(20)).await;

        consumer.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!handles[0].is_finished());
        assert_eq!(consumer.state(), LifecycleState::Stopped);

        queue.push("wake".to_string());
        let results = join_all(handles).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::Stopped { processed: 1 }
        );
        assert_eq!(consumer.stats().processed, 1);
    }

    #[tokio::test]
    async fn test_old_generation_does_not_hold_current_run_in_stopping() {
        let queue = ChannelQueue::<String>::shared("stragglers");
        let gate = Arc::new(Notify::new());
        let entered = Arc::new(AtomicBool::new(false));
        let pipeline = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            Pipeline::new().then("gate", move |m: String| {
                let gate = Arc::clone(&gate);
                let entered = Arc::clone(&entered);
                async move {
                    if m == "slow" {
                        entered.store(true, Ordering::SeqCst);
                        gate.notified().await;
                    }
                    Ok(m)
                }
            })
        };
        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            pipeline,
            1,
            2,
        );

        queue.push("slow".to_string());
        consumer.start().unwrap();
        let first_run = consumer.take_workers();
        assert!(wait_until(|| entered.load(Ordering::SeqCst)).await);

        consumer.stop();
        consumer.start().unwrap();
        let second_run = consumer.take_workers();
        consumer.force_stop("rotate").unwrap();
        queue.push("nudge".to_string());

        let results = join_all(second_run).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::Cancelled {
                reason: "rotate".to_string()
            }
        );

        // The first generation is still parked inside its stage
        assert!(!first_run[0].is_finished());
        assert_eq!(consumer.active_workers(), 1);
        assert_eq!(consumer.state(), LifecycleState::Stopped);

        consumer.start().unwrap();
        assert_eq!(consumer.generation(), 3);
        let third_run = consumer.take_workers();

        gate.notify_one();
        let results = join_all(first_run).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::Stopped { processed: 1 }
        );

        queue.close();
        let results = join_all(third_run).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::QueueClosed { processed: 0 }
        );
    }

    #[tokio::test]
    async fn test_restart_after_force_stop_uses_fresh_context() {
        let queue = ChannelQueue::<String>::shared("restart-cancel");
        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            1,
            1,
        );

        queue.push("first".to_string());
        consumer.start().unwrap();
        let first_run = consumer.take_workers();
        assert!(wait_until(|| consumer.stats().processed == 1).await);

        consumer.force_stop("rotate").unwrap();
        queue.push("nudge".to_string());
        join_all(first_run).await;
        assert_eq!(consumer.state(), LifecycleState::Stopped);

        consumer.start().unwrap();
        assert_eq!(consumer.generation(), 2);
        let second_run = consumer.take_workers();

        queue.push("second".to_string());
        assert!(wait_until(|| consumer.stats().processed == 3).await);

        queue.close();
        let results = join_all(second_run).await;
        assert_eq!(
            results[0].as_ref().unwrap(),
            &WorkerExit::QueueClosed { processed: 1 }
        );
    }

    #[tokio::test]
    async fn test_process_next_requires_run_context() {
        let queue = ChannelQueue::<String>::shared("manual");
        let (mut consumer, _metrics) = build_consumer(
            queue.clone() as Arc<dyn MessageQueue<String>>,
            passthrough(),
            1,
            1,
        );

        let err = consumer.process_next().await.unwrap_err();
        assert!(err.is_not_initialized());

        // Start then stop at once: the worker sees the cleared flag on its first check
        consumer.start().unwrap();
        let handles = consumer.take_workers();
        consumer.stop();
        join_all(handles).await;

        queue.push("by hand".to_string());
        consumer.process_next().await.unwrap();
        assert_eq!(consumer.stats().processed, 1);
        assert_eq!(queue.pending(), 0);

        consumer.force_stop("done").unwrap();
        assert!(consumer.process_next().await.unwrap_err().is_cancelled());
    }
}
