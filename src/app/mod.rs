//! Driver application: arguments, configuration and the demo run loop

pub mod args;
pub mod config;
pub mod driver;
pub mod startup;
