//! HTTP poll messages
//!
//! The crate does not perform HTTP calls. [`HttpPollRequest`] is the message
//! type the HTTP consumer factory works with; stages decide what to do with it.

mod request;

pub use request::{HttpPollRequest, DEFAULT_METHOD, DEFAULT_TIMEOUT_SECS};
