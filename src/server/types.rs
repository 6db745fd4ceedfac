//! Helper API server state.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::measure::Measurer;

/// Shared state for the helper API.
#[derive(Clone)]
pub struct ServerState {
    /// Runs every measurement
    pub measurer: Arc<Measurer>,
    /// Requests currently being measured
    pub in_flight: Arc<AtomicUsize>,
    /// Index of the last request received, used as log prefix
    pub request_index: Arc<AtomicU64>,
}

impl ServerState {
    /// Creates the state around a shared measurer.
    pub fn new(measurer: Arc<Measurer>) -> Self {
        Self {
            measurer,
            in_flight: Arc::new(AtomicUsize::new(0)),
            request_index: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Assigns the next request index.
    pub fn next_index(&self) -> u64 {
        self.request_index.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Counts a request as in flight until the returned guard is dropped.
    pub fn enter(&self) -> InFlightGuard {
        let count = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        InFlightGuard {
            counter: self.in_flight.clone(),
            count,
        }
    }
}

/// Decrements the in-flight counter on drop.
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
    count: usize,
}

impl InFlightGuard {
    /// Number of in-flight requests when this one entered, itself included.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
