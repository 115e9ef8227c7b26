//! Bounded-concurrency admission gate
//!
//! A counting semaphore shared by all workers of a consumer. A worker holds
//! one permit from before it pulls a message until its pipeline finishes, so
//! at most `capacity` messages are ever in flight.

use crate::consumer::error::{ConsumerError, ConsumerResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_LIMITER_CAPACITY: usize = 3;

#[derive(Debug)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Limiter {
    pub fn new(capacity: usize) -> ConsumerResult<Self> {
        if capacity == 0 {
            return Err(ConsumerError::invalid_config(
                "limiter capacity must be at least 1",
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Wait for a permit; released when the returned guard drops
    pub async fn acquire(&self) -> ConsumerResult<LimiterPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ConsumerError::LimiterClosed)?;
        Ok(self.admit(permit))
    }

    pub fn try_acquire(&self) -> Option<LimiterPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> LimiterPermit {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        LimiterPermit {
            in_flight: Arc::clone(&self.in_flight),
            _permit: permit,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits held at once since creation
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

/// Held permit
///
/// Dropping it (normal return, `?`, or unwinding) gives the permit back.
#[derive(Debug)]
pub struct LimiterPermit {
    in_flight: Arc<AtomicUsize>,
    // Dropped after `drop()` runs, so the counter falls before the permit frees
    _permit: OwnedSemaphorePermit,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
