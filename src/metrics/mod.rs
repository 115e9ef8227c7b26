//! Metrics sinks
//!
//! The consumer reports lifecycle events (start, stop, force stop, worker
//! cancellation, worker failure) as short text lines. A sink is
//! fire-and-forget: it must not block and its failures are ignored.

use crate::core::sync::handle_mutex_poison;
use std::sync::Mutex;

/// Destination for consumer lifecycle lines
pub trait MetricsSink: Send + Sync {
    fn log(&self, text: &str);
}

/// Forwards every line to the `log` facade at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn log(&self, text: &str) {
        log::info!(target: "msgpipe::metrics", "[Metrics] {}", text);
    }
}

/// Keeps every line in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryMetricsSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        handle_mutex_poison(self.lines.lock(), |message| message)
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Whether any recorded line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn log(&self, text: &str) {
        if let Ok(mut lines) = handle_mutex_poison(self.lines.lock(), |message| message) {
            lines.push(text.to_string());
        }
    }
}
