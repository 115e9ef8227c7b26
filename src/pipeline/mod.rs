//! Message pipelines
//!
//! A [`Pipeline`] is an ordered list of async [`Stage`]s. Each message pulled
//! by a consumer worker runs through every stage in order; the output of one
//! stage is the input of the next.

mod error;
mod retry;
mod sequence;
mod stage;

pub use error::{StageError, StageResult};
pub use retry::RetryStage;
pub use sequence::Pipeline;
pub use stage::{stage_fn, FnStage, Stage};
