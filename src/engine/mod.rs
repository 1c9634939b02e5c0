//! Timetable generation engine.
//!
//! # Pipeline
//!
//! 1. Seed locked lessons into the [`OccupancyIndex`](occupancy::OccupancyIndex)
//! 2. Expand allocations into the lesson queue ([`expander`])
//! 3. Search placements for the queue ([`search`]), checking every
//!    candidate with the [`evaluator`]
//! 4. Assemble the timetable and conflicts ([`result`])
//!
//! Everything is rebuilt from the request on every call and dropped at the
//! end, so one engine can serve any number of runs.
//!
//! # Example
//!
//! ```
//! use u_timetable::engine::{CancellationToken, NoProgress, TimetableEngine, TimetableRequest};
//! use u_timetable::models::*;
//!
//! let request = TimetableRequest::new()
//!     .with_time_grid(
//!         TimeGrid::new("week")
//!             .with_days(["Mon", "Tue"])
//!             .with_period(Period::lesson("p1", "08:00", "08:45")),
//!     )
//!     .with_class_group(ClassGroup::new("7A", "week"))
//!     .with_subject(Subject::core("MATH"))
//!     .with_teacher(Teacher::new("T1"))
//!     .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
//!     .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(2, 1));
//!
//! let result = TimetableEngine::default()
//!     .solve(&request, &NoProgress, &CancellationToken::new())
//!     .unwrap();
//! assert!(result.is_complete());
//! assert_eq!(result.timetable.slot_count(), 2);
//! ```

mod catalog;
pub mod evaluator;
pub mod expander;
pub mod kpi;
pub mod occupancy;
pub mod progress;
pub mod result;
pub mod search;

pub use catalog::Catalog;
pub use kpi::TimetableKpi;
pub use progress::{CancellationToken, NoProgress, Progress, ProgressSink};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    AcademicStructure, ClassGroup, LockedLesson, Subject, Teacher, TeacherAllocation,
    TimeConstraint, TimeGrid, TimetableResult,
};
use crate::validation::check_locked_lesson;
use occupancy::{OccupancyIndex, Occupant, Placement};

/// Everything a run needs: the immutable snapshot handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableRequest {
    pub allocations: Vec<TeacherAllocation>,
    pub class_groups: Vec<ClassGroup>,
    pub academic_structure: AcademicStructure,
    pub time_grids: Vec<TimeGrid>,
    pub time_constraints: Vec<TimeConstraint>,
    pub current_academic_year: String,
    pub locked_lessons: Vec<LockedLesson>,
    pub teachers: Vec<Teacher>,
}

impl TimetableRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_academic_year(mut self, year: impl Into<String>) -> Self {
        self.current_academic_year = year.into();
        self
    }

    pub fn with_time_grid(mut self, grid: TimeGrid) -> Self {
        self.time_grids.push(grid);
        self
    }

    pub fn with_class_group(mut self, class_group: ClassGroup) -> Self {
        self.class_groups.push(class_group);
        self
    }

    /// Replaces the academic structure.
    pub fn with_academic_structure(mut self, structure: AcademicStructure) -> Self {
        self.academic_structure = structure;
        self
    }

    /// Adds one subject to the academic structure.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.academic_structure.subjects.push(subject);
        self
    }

    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    pub fn with_allocation(mut self, allocation: TeacherAllocation) -> Self {
        self.allocations.push(allocation);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<TimeConstraint>) -> Self {
        self.time_constraints.push(constraint.into());
        self
    }

    pub fn with_locked_lesson(mut self, lock: LockedLesson) -> Self {
        self.locked_lessons.push(lock);
        self
    }
}

/// A locked lesson resolved against its grid.
struct SeededLock<'a> {
    lock: &'a LockedLesson,
    grid: &'a TimeGrid,
    subject: &'a Subject,
    start: usize,
    slot_id: String,
}

impl SeededLock<'_> {
    fn placement(&self) -> Placement<'_> {
        Placement {
            occupant: Occupant {
                id: &self.slot_id,
                class_group_id: &self.lock.class_group_id,
                subject_id: &self.lock.subject_id,
                teacher_id: &self.lock.teacher_id,
                category: self.subject.category,
                elective_group: self.subject.elective_group.as_deref(),
            },
            grid: self.grid,
            day: &self.lock.day,
            start: self.start,
            duration: self.lock.duration as usize,
        }
    }
}

/// Generates timetables.
#[derive(Debug, Clone, Default)]
pub struct TimetableEngine {
    config: EngineConfig,
}

impl TimetableEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one generation synchronously.
    ///
    /// Never fails for unplaceable lessons or malformed records: those end
    /// up in `conflicts` and `skipped`.
    ///
    /// # Errors
    /// - `Cancelled` if `cancel` was set before the run finished
    /// - `InvalidConfig` if the engine configuration is out of range
    pub fn solve<S: ProgressSink + ?Sized>(
        &self,
        request: &TimetableRequest,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<TimetableResult> {
        self.config.validate()?;
        let span = info_span!("solve", academic_year = %request.current_academic_year);
        let _enter = span.enter();
        let started = Instant::now();
        cancel.check()?;

        let catalog = Catalog::new(request);
        let mut skipped = Vec::new();

        let mut locks = Vec::new();
        for lock in &request.locked_lessons {
            if let Some(err) = check_locked_lesson(&catalog, lock) {
                warn!(reason = %err.message, "skipping locked lesson");
                skipped.push(err);
                continue;
            }
            let Some((_, grid)) = catalog.schedulable(&lock.class_group_id) else {
                debug!(class_group = %lock.class_group_id, "locked lesson in a class group that is not timetabled");
                continue;
            };
            let (Some(subject), Some(start)) = (catalog.subject(&lock.subject_id), grid.period_index(&lock.period_id))
            else {
                continue;
            };
            locks.push(SeededLock {
                lock,
                grid,
                subject,
                start,
                slot_id: lock.slot_id(),
            });
        }

        let locked_pairs: HashSet<(&str, &str)> = locks
            .iter()
            .map(|l| (l.lock.subject_id.as_str(), l.lock.class_group_id.as_str()))
            .collect();
        let expansion = expander::expand_lessons(&catalog, request, &locked_pairs);
        skipped.extend(expansion.skipped);
        let plans = search::plan_lessons(&catalog, &expansion.lessons);

        let mut index = OccupancyIndex::new();
        for seeded in &locks {
            index.place(&seeded.placement());
        }

        info!(
            lessons = plans.len(),
            locked = locks.len(),
            excluded_by_lock = expansion.excluded_by_lock,
            skipped = skipped.len(),
            "starting search"
        );

        let outcome = search::SolverSession::new(&catalog, &plans, index, sink, cancel)
            .with_progress_interval(self.config.progress_interval)
            .with_max_backtracks(self.config.max_backtracks)
            .run();
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "run cancelled");
                return Err(err);
            }
        };

        if !self.config.report_skipped {
            skipped.clear();
        }
        let result = result::build_result(&catalog, request, &plans, &outcome, skipped);
        info!(
            placed = result.lessons_placed,
            total = result.lessons_total,
            conflicts = result.conflicts.len(),
            backtracks = result.backtracks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(result)
    }
}
