//! School timetable generation.
//!
//! Turns a school snapshot (time grids, class groups, subjects, teachers,
//! teacher allocations and time constraints) into a weekly timetable, or
//! into the best partial timetable plus a list of conflicts explaining what
//! could not be placed.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `TimeGrid`, `Period`, `ClassGroup`,
//!   `Subject`, `Teacher`, `TeacherAllocation`, `TimeConstraint`, `Lesson`,
//!   `GeneratedTimetable`, `Conflict`, `TimetableResult`
//! - **`engine`**: Lesson expansion, slot occupancy, constraint checks,
//!   chronological backtracking search and result assembly
//! - **`worker`**: Background execution over message channels with
//!   progress reporting and cancellation
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling refs,
//!   impossible lesson definitions)
//! - **`audit`**: Re-checks a finished timetable and reports violations
//! - **`demo`**: Seeded synthetic schools for benchmarks and tests
//!
//! # Architecture
//!
//! The engine is synchronous and owns no state between runs: every call to
//! [`TimetableEngine::solve`] rebuilds its indexes from the request. The
//! [`TimetableWorker`] wraps it in a dedicated thread so a caller can keep
//! serving its own loop while a run is in progress.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - de Werra (1985), "An introduction to timetabling"

pub mod audit;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod models;
pub mod validation;
pub mod worker;

pub use config::EngineConfig;
pub use engine::{CancellationToken, NoProgress, Progress, ProgressSink, TimetableEngine, TimetableRequest};
pub use error::{Result, TimetableError};
pub use models::{Conflict, ConflictKind, GeneratedTimetable, TimetableResult};
pub use worker::{RunId, TimetableWorker, WorkerEvent};
