pub mod app;
pub mod consumer;
pub mod core;
pub mod http;
pub mod metrics;
pub mod pipeline;
pub mod queue;
