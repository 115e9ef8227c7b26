//! Unbounded multi-producer/multi-consumer FIFO queue
//!
//! Built on a tokio unbounded channel. The single receiver sits behind an
//! async mutex so any number of workers can pull; tokio's mutex is fair, so
//! waiting pullers are served in arrival order and every message reaches
//! exactly one of them.

use crate::core::sync::handle_mutex_poison;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::MessageQueue;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

/// Reference queue implementation
///
/// Construct one explicitly and share it with `Arc`; there is no global
/// instance. Closing the queue rejects further pushes while letting pullers
/// drain what is already buffered.
pub struct ChannelQueue<T> {
    queue_id: String,
    sender: Mutex<Option<mpsc::UnboundedSender<T>>>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<T>>,
    pushed: AtomicU64,
    pulled: AtomicU64,
}

impl<T> ChannelQueue<T>
where
    T: Send + 'static,
{
    pub fn new(queue_id: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            queue_id: queue_id.into(),
            sender: Mutex::new(Some(sender)),
            receiver: AsyncMutex::new(receiver),
            pushed: AtomicU64::new(0),
            pulled: AtomicU64::new(0),
        }
    }

    /// Create a queue already wrapped for sharing
    pub fn shared(queue_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(queue_id))
    }

    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    /// Stop accepting messages; buffered messages remain pullable
    pub fn close(&self) {
        match handle_mutex_poison(self.sender.lock(), |message| QueueError::OperationFailed {
            message,
        }) {
            Ok(mut sender) => {
                if sender.take().is_some() {
                    log::debug!("Queue '{}' closed", self.queue_id);
                }
            }
            Err(e) => log::error!("Queue '{}' could not be closed: {}", self.queue_id, e),
        }
    }

    pub fn is_closed(&self) -> bool {
        handle_mutex_poison(self.sender.lock(), |message| QueueError::OperationFailed {
            message,
        })
        .map(|sender| sender.is_none())
        .unwrap_or(true)
    }

    /// Messages pushed but not yet pulled
    pub fn pending(&self) -> u64 {
        self.pushed_count().saturating_sub(self.pulled_count())
    }

    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Acquire)
    }

    pub fn pulled_count(&self) -> u64 {
        self.pulled.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<T> MessageQueue<T> for ChannelQueue<T>
where
    T: Send + 'static,
{
    fn push(&self, message: T) -> bool {
        let sender = match handle_mutex_poison(self.sender.lock(), |message| {
            QueueError::OperationFailed { message }
        }) {
            Ok(sender) => sender,
            Err(e) => {
                log::error!("Queue '{}' rejected push: {}", self.queue_id, e);
                return false;
            }
        };

        let Some(tx) = sender.as_ref() else {
            log::debug!("Queue '{}' rejected push: closed", self.queue_id);
            return false;
        };

        // Count before sending so a fast puller never sees pulled > pushed
        self.pushed.fetch_add(1, Ordering::AcqRel);
        if tx.send(message).is_err() {
            self.pushed.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    async fn pull(&self) -> QueueResult<T> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(message) => {
                self.pulled.fetch_add(1, Ordering::AcqRel);
                Ok(message)
            }
            None => Err(QueueError::Closed {
                queue_id: self.queue_id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::task::JoinSet;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_pull_returns_messages_in_fifo_order() {
        let queue = ChannelQueue::new("fifo");
        for i in 0..5 {
            assert!(queue.push(i));
        }

        for expected in 0..5 {
            assert_eq!(queue.pull().await.unwrap(), expected);
        }
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.pushed_count(), 5);
        assert_eq!(queue.pulled_count(), 5);
    }

    #[tokio::test]
    async fn test_pull_waits_for_a_push() {
        let queue = ChannelQueue::<String>::shared("waiting");

        let empty = timeout(Duration::from_millis(50), queue.pull()).await;
        assert!(empty.is_err(), "pull on an empty queue should suspend");

        let puller = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pull().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.push("late".to_string()));

        let pulled = timeout(Duration::from_secs(1), puller).await.unwrap().unwrap();
        assert_eq!(pulled.unwrap(), "late");
    }

    #[tokio::test]
    async fn test_close_rejects_push_and_drains_buffer() {
        let queue = ChannelQueue::new("closing");
        assert!(queue.push(1));
        assert!(queue.push(2));

        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.push(3));

        assert_eq!(queue.pull().await.unwrap(), 1);
        assert_eq!(queue.pull().await.unwrap(), 2);
        match queue.pull().await {
            Err(QueueError::Closed { queue_id }) => assert_eq!(queue_id, "closing"),
            other => panic!("Expected Closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_wakes_suspended_puller() {
        let queue = ChannelQueue::<u32>::shared("wake");
        let puller = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pull().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.close();

        let result = timeout(Duration::from_secs(1), puller).await.unwrap().unwrap();
        assert!(result.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_concurrent_pullers_receive_each_message_once() {
        let queue = ChannelQueue::<usize>::shared("mpmc");
        let mut pullers = JoinSet::new();

        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            pullers.spawn(async move {
                let mut received = Vec::new();
                while let Ok(message) = queue.pull().await {
                    received.push(message);
                }
                received
            });
        }

        let mut producers = JoinSet::new();
        for producer in 0..4 {
            let queue = Arc::clone(&queue);
            producers.spawn(async move {
                for i in 0..50 {
                    assert!(queue.push(producer * 1000 + i));
                    tokio::task::yield_now().await;
                }
            });
        }
        while producers.join_next().await.is_some() {}
        queue.close();

        let mut seen = HashSet::new();
        let mut total = 0;
        while let Some(result) = pullers.join_next().await {
            for message in result.unwrap() {
                assert!(seen.insert(message), "message {} delivered twice", message);
                total += 1;
            }
        }
        assert_eq!(total, 200);
    }
}
