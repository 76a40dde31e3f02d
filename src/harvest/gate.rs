//! Counting permit pool bounding in-flight detail fetches

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

struct GateState {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Fixed-capacity permit pool
///
/// `acquire` suspends until a permit is free and returns a `GatePermit`
/// guard. The permit goes back to the pool when the guard is dropped, so it
/// is released exactly once whether the guarded task completes, fails,
/// panics, or is cancelled by a timeout.
///
/// Cloning the gate shares the same pool.
#[derive(Clone)]
pub struct ConcurrencyGate {
    state: Arc<GateState>,
}

/// Scoped permit returned by [`ConcurrencyGate::acquire`]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    state: Arc<GateState>,
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` permits (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            state: Arc::new(GateState {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Waits for a free permit
    ///
    /// Only fails if the underlying pool has been closed, which this gate
    /// never does.
    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        let permit = self.state.semaphore.clone().acquire_owned().await?;

        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            _permit: permit,
            state: Arc::clone(&self.state),
        })
    }

    /// Total number of permits
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.state.semaphore.available_permits()
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time since creation
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("capacity", &self.capacity())
            .field("in_flight", &self.in_flight())
            .field("peak", &self.peak())
            .finish()
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // The semaphore permit itself is returned when `_permit` drops right after this
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
