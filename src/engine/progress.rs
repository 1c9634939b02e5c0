//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimetableError};

/// A progress update from a running search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Progress {
    /// About to try placing a lesson.
    Placing {
        placed: usize,
        total: usize,
        current_lesson: String,
    },
    /// A lesson ran out of candidates.
    Backtracked {
        placed: usize,
        total: usize,
        /// Backtracks over the whole run so far.
        backtracks: u64,
        /// The lesson that has backtracked most often so far.
        most_difficult_lesson: String,
    },
}

impl Progress {
    /// Lessons placed when the event was emitted.
    pub fn placed(&self) -> usize {
        match self {
            Progress::Placing { placed, .. } | Progress::Backtracked { placed, .. } => *placed,
        }
    }

    /// Total lessons in the queue.
    pub fn total(&self) -> usize {
        match self {
            Progress::Placing { total, .. } | Progress::Backtracked { total, .. } => *total,
        }
    }
}

/// Receives progress events.
///
/// Implementations must not block the search for long; the worker's sink
/// drops events when its channel is full.
pub trait ProgressSink {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress),
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}

/// Shared cancellation flag, polled at every recursion entry.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TimetableError::Cancelled)
        } else {
            Ok(())
        }
    }
}
