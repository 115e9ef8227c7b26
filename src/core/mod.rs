//! Core services and infrastructure shared by the library and the driver

pub mod error_handling;
pub mod logging;
pub mod retry;
pub mod shutdown;
pub mod sync;
pub mod validation;
pub mod version;
