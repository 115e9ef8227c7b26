//! Pluggable message queues
//!
//! Producers push messages into a queue and consumer workers pull them out.
//! The [`MessageQueue`] trait is the whole contract; any implementation can
//! be shared behind `Arc<dyn MessageQueue<T>>`.
//!
//! ```text
//! ┌────────────┐  push   ┌──────────────┐  pull   ┌──────────┐
//! │ Producer A ├────────►│              ├────────►│ Worker 0 │
//! └────────────┘         │ MessageQueue │         └──────────┘
//! ┌────────────┐  push   │   (shared)   │  pull   ┌──────────┐
//! │ Producer B ├────────►│              ├────────►│ Worker 1 │
//! └────────────┘         └──────────────┘         └──────────┘
//! ```
//!
//! Two implementations ship with the crate:
//!
//! - [`ChannelQueue`]: unbounded MPMC FIFO, closable
//! - [`StubQueue`]: synthesises a fixed message on pull, discards pushes

mod channel;
mod error;
mod producer;
mod stub;
mod traits;

pub use channel::ChannelQueue;
pub use error::{QueueError, QueueResult};
pub use producer::Producer;
pub use stub::{StubQueue, DEFAULT_STUB_MESSAGE};
pub use traits::MessageQueue;
