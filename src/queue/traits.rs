//! The queue capability consumed by producers and consumer workers

use crate::queue::error::QueueResult;
use async_trait::async_trait;

/// A hand-off point between producers and consumer workers
///
/// Implementations are shared behind `Arc` by every producer and every
/// worker of a consumer, so both operations take `&self` and must be
/// internally synchronised.
///
/// # Contract
///
/// - `push` never blocks. It returns `false` when the message was not
///   accepted (for example because the queue is closed).
/// - `pull` suspends until a message is available. Each message is handed to
///   exactly one puller. A queue that can be closed reports
///   [`QueueError::Closed`](crate::queue::QueueError::Closed) once it is
///   closed and drained; a queue that is never closed never returns an error
///   from an empty state, it simply keeps waiting.
/// - `pull` must be cancel safe: dropping the returned future loses no
///   message.
///
/// # Example
///
/// ```rust
/// use msgpipe::queue::{ChannelQueue, MessageQueue};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = ChannelQueue::<String>::new("jobs");
/// assert!(queue.push("first".to_string()));
/// assert_eq!(queue.pull().await?, "first");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MessageQueue<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Offer a message to the queue without waiting
    fn push(&self, message: T) -> bool;

    /// Wait for the next message
    async fn pull(&self) -> QueueResult<T>;
}
