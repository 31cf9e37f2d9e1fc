//! Progress reporting and cancellation.
//!
//! Long-running batch operations accept a `&dyn ProgressMonitor`. Cancellation
//! is coarse-grained: callers check [`ProgressMonitor::is_cancelled`] between
//! units of work, never in the middle of one.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives progress notifications and answers cancellation queries.
///
/// Every method has a no-op default so implementors only override what they
/// observe.
pub trait ProgressMonitor: Send + Sync {
    /// A task with `total` units of work is starting.
    fn begin_task(&self, _name: &str, _total: usize) {}

    /// `units` more units of work completed.
    fn worked(&self, _units: usize) {}

    /// Whether the caller asked to stop.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// The current task finished.
    fn done(&self) {}
}

/// A monitor that ignores everything and is never cancelled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {}

/// A cloneable monitor whose clones share cancellation state and a work
/// counter.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    worked: Arc<AtomicUsize>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next check between items.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Total units reported through [`ProgressMonitor::worked`].
    pub fn units_worked(&self) -> usize {
        self.worked.load(Ordering::SeqCst)
    }
}

impl ProgressMonitor for CancellationToken {
    fn worked(&self, units: usize) {
        self.worked.fetch_add(units, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
