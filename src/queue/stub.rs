//! A queue that does not queue
//!
//! Every pull yields a copy of a fixed template message and every push is
//! logged and thrown away. Useful for demos and for keeping workers busy in
//! tests; never for real traffic.

use crate::queue::error::QueueResult;
use crate::queue::traits::MessageQueue;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_STUB_MESSAGE: &str = "Default Message";

pub struct StubQueue<T> {
    template: T,
    pull_delay: Duration,
    discarded: AtomicU64,
    synthesized: AtomicU64,
}

impl StubQueue<String> {
    /// Stub yielding `"Default Message"` on every pull
    pub fn default_text() -> Self {
        Self::new(DEFAULT_STUB_MESSAGE.to_string())
    }
}

impl<T> StubQueue<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    pub fn new(template: T) -> Self {
        Self {
            template,
            pull_delay: Duration::ZERO,
            discarded: AtomicU64::new(0),
            synthesized: AtomicU64::new(0),
        }
    }

    /// Make each pull wait before yielding, to throttle busy workers
    pub fn with_pull_delay(mut self, pull_delay: Duration) -> Self {
        self.pull_delay = pull_delay;
        self
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn synthesized_count(&self) -> u64 {
        self.synthesized.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<T> MessageQueue<T> for StubQueue<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    fn push(&self, message: T) -> bool {
        log::debug!("Stub queue discarding message: {:?}", message);
        self.discarded.fetch_add(1, Ordering::Relaxed);
        true
    }

    async fn pull(&self) -> QueueResult<T> {
        if !self.pull_delay.is_zero() {
            tokio::time::sleep(self.pull_delay).await;
        }
        self.synthesized.fetch_add(1, Ordering::Relaxed);
        Ok(self.template.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pull_synthesizes_template() {
        let queue = StubQueue::default_text();
        assert_eq!(queue.pull().await.unwrap(), "Default Message");
        assert_eq!(queue.pull().await.unwrap(), "Default Message");
        assert_eq!(queue.synthesized_count(), 2);
    }

    #[tokio::test]
    async fn test_push_is_accepted_and_dropped() {
        let queue = StubQueue::new(7u32);
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert_eq!(queue.discarded_count(), 2);
        assert_eq!(queue.pull().await.unwrap(), 7);
    }
}
