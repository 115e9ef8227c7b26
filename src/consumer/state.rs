//! Lifecycle state and per-run cancellation context

use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::core::sync::handle_mutex_poison;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use strum_macros::{AsRefStr, Display};

/// Consumer lifecycle
///
/// ```text
/// Idle ──start──► Running ──stop──► Stopped ──start──► Running
///                    │
///                    └──force_stop──► Stopping ──(workers gone)──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// States from which a fresh worker generation may be spawned
    pub fn can_start(self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Stopped)
    }
}

/// Flags shared by every worker of one generation
///
/// Each `start()` creates a new context, so flipping flags on an old run
/// never affects workers of a newer one.
#[derive(Debug)]
pub(crate) struct RunContext {
    generation: u64,
    running: AtomicBool,
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
    live_workers: AtomicUsize,
}

impl RunContext {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            running: AtomicBool::new(true),
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
            live_workers: AtomicUsize::new(0),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Workers of this run whose tasks have not ended yet
    pub(crate) fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    pub(crate) fn worker_spawned(&self) {
        self.live_workers.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn worker_ended(&self) {
        self.live_workers.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn halt(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Request cancellation; the first reason wins
    pub(crate) fn cancel(&self, reason: &str) -> ConsumerResult<()> {
        let mut slot = handle_mutex_poison(self.reason.lock(), |message| {
            ConsumerError::SyncError { message }
        })?;
        if slot.is_none() {
            *slot = Some(reason.to_string());
        }
        self.cancelled.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel_reason(&self) -> String {
        handle_mutex_poison(self.reason.lock(), |message| message)
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or_default()
    }

    /// Loop-top check: `Err(Cancelled)` once force stop was requested
    pub(crate) fn check_cancelled(&self) -> ConsumerResult<()> {
        if self.is_cancelled() {
            return Err(ConsumerError::Cancelled {
                reason: self.cancel_reason(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::Idle.to_string(), "idle");
        assert_eq!(LifecycleState::Stopping.as_ref(), "stopping");
    }

    #[test]
    fn test_can_start() {
        assert!(LifecycleState::Idle.can_start());
        assert!(LifecycleState::Stopped.can_start());
        assert!(!LifecycleState::Running.can_start());
        assert!(!LifecycleState::Stopping.can_start());
    }

    #[test]
    fn test_first_cancel_reason_wins() {
        let run = RunContext::new(1);
        assert!(run.check_cancelled().is_ok());

        run.cancel("deadline").unwrap();
        run.cancel("second").unwrap();

        assert!(run.is_cancelled());
        assert!(run.is_running());
        match run.check_cancelled() {
            Err(ConsumerError::Cancelled { reason }) => assert_eq!(reason, "deadline"),
            other => panic!("expected cancellation, got {:?}", other),
        }
    }

    #[test]
    fn test_halt_only_clears_running() {
        let run = RunContext::new(7);
        run.halt();
        assert!(!run.is_running());
        assert!(!run.is_cancelled());
        assert_eq!(run.generation(), 7);
    }

    #[test]
    fn test_live_workers_are_counted_per_run() {
        let old = RunContext::new(1);
        let current = RunContext::new(2);
        old.worker_spawned();
        current.worker_spawned();
        current.worker_ended();

        assert_eq!(old.live_workers(), 1);
        assert_eq!(current.live_workers(), 0);
    }
}
