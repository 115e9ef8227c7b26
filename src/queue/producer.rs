//! Producer handle for pushing messages into a queue
//!
//! A producer is a thin, named wrapper around a shared queue. Any number of
//! producers may hold the same queue.

use crate::queue::traits::MessageQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Named handle that forwards messages to a shared queue
///
/// # Example
///
/// ```rust
/// use msgpipe::queue::{ChannelQueue, MessageQueue, Producer};
/// use std::sync::Arc;
///
/// let queue: Arc<dyn MessageQueue<String>> = ChannelQueue::<String>::shared("jobs");
/// let producer = Producer::new("ingest", Arc::clone(&queue));
///
/// assert!(producer.produce("hello".to_string()));
/// assert_eq!(producer.produced_count(), 1);
/// ```
pub struct Producer<T> {
    producer_id: String,
    queue: Arc<dyn MessageQueue<T>>,
    produced: AtomicU64,
    rejected: AtomicU64,
}

impl<T> Producer<T>
where
    T: Send + 'static,
{
    pub fn new(producer_id: impl Into<String>, queue: Arc<dyn MessageQueue<T>>) -> Self {
        Self {
            producer_id: producer_id.into(),
            queue,
            produced: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    /// Push a message; `false` when the queue refused it
    pub fn produce(&self, message: T) -> bool {
        if self.queue.push(message) {
            self.produced.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            log::debug!("Producer '{}': message rejected by queue", self.producer_id);
            false
        }
    }

    pub fn produced_count(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ChannelQueue;

    #[tokio::test]
    async fn test_producers_share_one_queue() {
        let queue = ChannelQueue::<String>::shared("shared");
        let first = Producer::new("first", queue.clone() as Arc<dyn MessageQueue<String>>);
        let second = Producer::new("second", queue.clone() as Arc<dyn MessageQueue<String>>);

        assert!(first.produce("a".to_string()));
        assert!(second.produce("b".to_string()));

        assert_eq!(queue.pull().await.unwrap(), "a");
        assert_eq!(queue.pull().await.unwrap(), "b");
        assert_eq!(first.producer_id(), "first");
        assert_eq!(second.produced_count(), 1);
    }

    #[test]
    fn test_rejected_push_is_counted() {
        let queue = ChannelQueue::<u8>::shared("closed");
        queue.close();
        let producer = Producer::new("late", queue as Arc<dyn MessageQueue<u8>>);

        assert!(!producer.produce(1));
        assert_eq!(producer.produced_count(), 0);
        assert_eq!(producer.rejected_count(), 1);
    }
}
