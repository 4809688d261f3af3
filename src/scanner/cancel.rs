//! Cooperative cancellation handle shared between the caller and the engine

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const ABORTED: u8 = 2;

/// Shared cancellation state
///
/// `cancel` stops the dispatcher from assigning new batches while in-flight
/// batches drain. `abort` additionally makes workers stop between files of
/// their current batch. Neither interrupts a file scan that has started.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    state: Arc<AtomicU8>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a graceful stop
    pub fn cancel(&self) {
        // Never downgrade an abort
        let _ = self
            .state
            .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Request that workers stop between files
    pub fn abort(&self) {
        self.state.store(ABORTED, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) != RUNNING
    }

    pub fn is_aborted(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABORTED
    }
}
