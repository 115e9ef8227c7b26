//! Consumer execution model
//!
//! A [`Consumer`] runs a pool of identical workers. Each worker repeatedly
//! takes a [`Limiter`] permit, pulls one message from the shared queue, runs
//! it through the [`crate::pipeline::Pipeline`], and gives the permit back.
//!
//! ```text
//!                 ┌─────────────── Consumer ───────────────┐
//!                 │  Limiter (capacity N permits)          │
//! ┌───────┐ pull  │  ┌──────────┐  ┌──────────┐            │
//! │ Queue ├──────►│  │ Worker 0 │  │ Worker 1 │  ...  K    │
//! └───────┘       │  └────┬─────┘  └────┬─────┘            │
//!                 │       ▼             ▼                  │
//!                 │   stage 1 → stage 2 → ... → stage n    │
//!                 └────────────────────────────────────────┘
//! ```
//!
//! Lifecycle: `Idle → Running → Stopped` via [`Consumer::start`] and
//! [`Consumer::stop`]; [`Consumer::force_stop`] moves a running consumer to
//! `Stopping` until its workers have observed the cancellation.

mod config;
mod error;
mod factory;
mod limiter;
mod pool;
mod state;
mod worker;

#[cfg(test)]
mod tests;

pub use config::{ConsumerConfig, DEFAULT_WORKER_COUNT};
pub use error::{ConsumerError, ConsumerResult};
pub use factory::{
    channel_text_consumer, default_stub_consumer, http_call_consumer, http_pipeline,
    text_pipeline, CHANNEL_CONSUMER_LIMIT, CHANNEL_CONSUMER_WORKERS, HTTP_CONSUMER_LIMIT,
    HTTP_CONSUMER_WORKERS, STUB_CONSUMER_LIMIT, STUB_CONSUMER_WORKERS,
};
pub use limiter::{Limiter, LimiterPermit, DEFAULT_LIMITER_CAPACITY};
pub use pool::Consumer;
pub use state::LifecycleState;
pub use worker::{ConsumerStats, StatsSnapshot, WorkerExit, WorkerHandle};
