//! Engine error type.
//!
//! Placement failures are not errors; they end up as
//! [`Conflict`](crate::models::Conflict)s in the result. Malformed input is
//! not an error either; it is reported as
//! [`ValidationError`](crate::validation::ValidationError)s.

use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, TimetableError>;

/// Errors that abort a run or the worker.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// The run was cancelled before it produced a result.
    #[error("timetable generation was cancelled")]
    Cancelled,

    /// The background worker thread could not be started.
    #[error("failed to spawn timetable worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The worker is gone (its thread ended or the event receiver closed).
    #[error("timetable worker disconnected")]
    WorkerDisconnected,

    /// The worker thread panicked.
    #[error("timetable worker panicked")]
    WorkerPanicked,

    /// A configuration value is out of range.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl TimetableError {
    /// Whether this error is a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
