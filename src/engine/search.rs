//! Chronological backtracking search.
//!
//! # Algorithm
//!
//! Depth-first over the lesson queue, one lesson per level:
//! 1. Check cancellation.
//! 2. If the queue is exhausted, succeed.
//! 3. Try candidates in fixed order: grid days in order, then start period
//!    ascending. For each legal candidate, place it, recurse, and return on
//!    success; otherwise unplace and continue.
//! 4. If no candidate leads to success, record a backtrack and fail, which
//!    makes the previous level try its next candidate.
//!
//! The first complete assignment wins. All run state lives in
//! [`SolverSession`], so sessions are independent and reentrant.
//!
//! # Failure
//!
//! When the whole queue is exhausted without success, the session reports
//! the deepest level at which a lesson ran out of candidates, together with
//! the placements that led there the first time it was reached. That lesson
//! and every lesson behind it are left unplaced.
//!
//! # Complexity
//! Worst case exponential in the number of lessons. Each node costs
//! O(days × periods × duration) legality checks; place/unplace are
//! O(duration).

use tracing::{debug, trace};

use super::evaluator::ConstraintEvaluator;
use super::occupancy::{OccupancyIndex, Occupant, Placement};
use super::progress::{CancellationToken, Progress, ProgressSink};
use super::Catalog;
use crate::error::Result;
use crate::models::{Lesson, TimeGrid};

/// A lesson resolved against the catalog, ready to be placed.
#[derive(Debug, Clone, Copy)]
pub struct LessonPlan<'a> {
    pub lesson: &'a Lesson,
    pub grid: &'a TimeGrid,
    pub occupant: Occupant<'a>,
}

impl<'a> LessonPlan<'a> {
    /// Resolves a lesson. `None` if its class group is not schedulable or
    /// its subject is unknown.
    pub fn new(catalog: &Catalog<'a>, lesson: &'a Lesson) -> Option<Self> {
        let (_, grid) = catalog.schedulable(&lesson.class_group_id)?;
        let subject = catalog.subject(&lesson.subject_id)?;
        Some(Self {
            lesson,
            grid,
            occupant: Occupant {
                id: &lesson.id,
                class_group_id: &lesson.class_group_id,
                subject_id: &lesson.subject_id,
                teacher_id: &lesson.teacher_id,
                category: subject.category,
                elective_group: subject.elective_group.as_deref(),
            },
        })
    }

    fn at(&self, day: &'a str, start: usize) -> Placement<'a> {
        Placement {
            occupant: self.occupant,
            grid: self.grid,
            day,
            start,
            duration: self.lesson.duration,
        }
    }
}

/// What a finished search leaves behind.
#[derive(Debug)]
pub struct SearchOutcome<'a> {
    /// Locked lessons plus every placement in `placements`.
    pub index: OccupancyIndex<'a>,
    /// Placements of the first `placements.len()` lessons of the queue.
    pub placements: Vec<Placement<'a>>,
    /// Queue position of the lesson that could not be placed, if the
    /// search failed. Lessons from here on are unplaced.
    pub failed_at: Option<usize>,
    /// Total backtracks over the run.
    pub backtracks: u64,
    /// Queue position of the lesson that backtracked most.
    pub most_difficult: Option<usize>,
}

impl SearchOutcome<'_> {
    pub fn is_complete(&self) -> bool {
        self.failed_at.is_none()
    }
}

/// All state of one search run.
pub struct SolverSession<'s, 'a, S: ProgressSink + ?Sized> {
    catalog: &'s Catalog<'a>,
    evaluator: ConstraintEvaluator<'s, 'a>,
    plans: &'s [LessonPlan<'a>],
    index: OccupancyIndex<'a>,
    sink: &'s S,
    cancel: &'s CancellationToken,
    progress_interval: u64,
    max_backtracks: Option<u64>,
    attempts: u64,
    /// Placements on the current branch, one per level.
    stack: Vec<Placement<'a>>,
    /// Backtracks per queue position.
    backtrack_counts: Vec<u64>,
    total_backtracks: u64,
    most_difficult: Option<usize>,
    /// Deepest dead end and the branch that first reached it.
    deepest: Option<(usize, Vec<Placement<'a>>)>,
    budget_spent: bool,
}

impl<'s, 'a, S: ProgressSink + ?Sized> SolverSession<'s, 'a, S> {
    /// Creates a session over `plans`, starting from `index` (which already
    /// holds the locked lessons).
    pub fn new(
        catalog: &'s Catalog<'a>,
        plans: &'s [LessonPlan<'a>],
        index: OccupancyIndex<'a>,
        sink: &'s S,
        cancel: &'s CancellationToken,
    ) -> Self {
        Self {
            catalog,
            evaluator: ConstraintEvaluator::new(catalog),
            plans,
            index,
            sink,
            cancel,
            progress_interval: 1,
            max_backtracks: None,
            attempts: 0,
            stack: Vec::with_capacity(plans.len()),
            backtrack_counts: vec![0; plans.len()],
            total_backtracks: 0,
            most_difficult: None,
            deepest: None,
            budget_spent: false,
        }
    }

    /// Emit a placing event every `interval` attempts.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Gives up once the backtrack count exceeds `limit`.
    pub fn with_max_backtracks(mut self, limit: Option<u64>) -> Self {
        self.max_backtracks = limit;
        self
    }

    /// Runs the search to completion.
    ///
    /// # Errors
    /// [`TimetableError::Cancelled`](crate::TimetableError::Cancelled) if the
    /// token was cancelled before the search finished.
    pub fn run(mut self) -> Result<SearchOutcome<'a>> {
        let solved = self.solve_from(0)?;
        // one last poll so a cancel racing the final placement still wins
        self.cancel.check()?;

        if solved {
            debug!(
                lessons = self.plans.len(),
                backtracks = self.total_backtracks,
                "search complete"
            );
            return Ok(SearchOutcome {
                index: self.index,
                placements: self.stack,
                failed_at: None,
                backtracks: self.total_backtracks,
                most_difficult: self.most_difficult,
            });
        }

        // The recursion unwound every placement; replay the deepest branch.
        let (failed_at, prefix) = self.deepest.take().unwrap_or_default();
        for placement in &prefix {
            self.index.place(placement);
        }
        debug!(
            failed_at,
            placed = prefix.len(),
            backtracks = self.total_backtracks,
            budget_spent = self.budget_spent,
            "search failed"
        );
        Ok(SearchOutcome {
            index: self.index,
            placements: prefix,
            failed_at: Some(failed_at),
            backtracks: self.total_backtracks,
            most_difficult: self.most_difficult,
        })
    }

    fn solve_from(&mut self, depth: usize) -> Result<bool> {
        self.cancel.check()?;
        let Some(&plan) = self.plans.get(depth) else {
            return Ok(true);
        };

        if self.attempts % self.progress_interval == 0 {
            self.sink.report(Progress::Placing {
                placed: depth,
                total: self.plans.len(),
                current_lesson: self.catalog.describe(plan.lesson),
            });
        }
        self.attempts += 1;

        let periods = plan.grid.periods.len();
        let duration = plan.lesson.duration;
        if duration <= periods {
            for day in &plan.grid.days {
                for start in 0..=periods - duration {
                    let candidate = plan.at(day, start);
                    if !self.evaluator.is_legal(&self.index, &candidate) {
                        continue;
                    }

                    self.index.place(&candidate);
                    self.stack.push(candidate);
                    if self.solve_from(depth + 1)? {
                        return Ok(true);
                    }
                    self.stack.pop();
                    self.index.unplace(&candidate);

                    if self.budget_spent {
                        return Ok(false);
                    }
                }
            }
        }

        self.dead_end(depth);
        Ok(false)
    }

    /// Records that the lesson at `depth` ran out of candidates.
    fn dead_end(&mut self, depth: usize) {
        self.backtrack_counts[depth] += 1;
        self.total_backtracks += 1;
        let worst = self
            .most_difficult
            .map_or(0, |i| self.backtrack_counts[i]);
        if self.backtrack_counts[depth] > worst {
            self.most_difficult = Some(depth);
        }

        if self.deepest.as_ref().map_or(true, |(d, _)| depth > *d) {
            self.deepest = Some((depth, self.stack.clone()));
        }

        if let Some(limit) = self.max_backtracks {
            if self.total_backtracks > limit {
                self.budget_spent = true;
            }
        }

        let hardest = self.most_difficult.unwrap_or(depth);
        trace!(depth, backtracks = self.total_backtracks, "backtrack");
        self.sink.report(Progress::Backtracked {
            placed: depth,
            total: self.plans.len(),
            backtracks: self.total_backtracks,
            most_difficult_lesson: self.catalog.describe(self.plans[hardest].lesson),
        });
    }
}

/// Resolves lessons into plans, dropping any that cannot be resolved.
pub fn plan_lessons<'a>(catalog: &Catalog<'a>, lessons: &'a [Lesson]) -> Vec<LessonPlan<'a>> {
    lessons
        .iter()
        .filter_map(|lesson| LessonPlan::new(catalog, lesson))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NoProgress;
    use crate::engine::TimetableRequest;
    use crate::error::TimetableError;
    use crate::models::{
        AcademicStructure, ClassGroup, Period, Subject, SubjectRule, Teacher, TeacherAllocation,
        TimeConstraint,
    };
    use std::cell::RefCell;

    /// 7A and 7B on one day with two periods.
    ///
    /// Queue: 7A MATH (T1), 7B ART (T2, unavailable at p1), 7B HIST (T1).
    /// ART can only take p2, so HIST needs p1. First fit puts MATH at p1,
    /// which leaves HIST nowhere to go; only moving MATH, two levels up,
    /// resolves it.
    fn two_level_request() -> TimetableRequest {
        TimetableRequest::new()
            .with_time_grid(
                TimeGrid::new("g1")
                    .with_day("Mon")
                    .with_period(Period::lesson("p1", "08:00", "08:45"))
                    .with_period(Period::lesson("p2", "08:50", "09:35")),
            )
            .with_class_group(ClassGroup::new("7A", "g1"))
            .with_class_group(ClassGroup::new("7B", "g1"))
            .with_academic_structure(AcademicStructure::with_subjects(vec![
                Subject::core("MATH"),
                Subject::core("ART"),
                Subject::core("HIST"),
            ]))
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_allocation(TeacherAllocation::new("T2", "7B", "ART"))
            .with_allocation(TeacherAllocation::new("T1", "7B", "HIST"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(1, 1))
            .with_constraint(SubjectRule::new("ART", "7B").with_lessons(1, 1))
            .with_constraint(SubjectRule::new("HIST", "7B").with_lessons(1, 1))
            .with_constraint(TimeConstraint::teacher_unavailable("T2", "Mon", "p1"))
    }

    fn lessons_of(request: &TimetableRequest) -> Vec<Lesson> {
        let catalog = Catalog::new(request);
        crate::engine::expander::expand_lessons(&catalog, request, &Default::default()).lessons
    }

    fn slots(outcome: &SearchOutcome<'_>) -> Vec<(String, &'static str)> {
        outcome
            .placements
            .iter()
            .map(|p| {
                let period = match p.start {
                    0 => "p1",
                    _ => "p2",
                };
                (p.occupant.id.to_string(), period)
            })
            .collect()
    }

    #[test]
    fn test_backtracks_across_levels() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();

        let outcome = SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &NoProgress, &cancel)
            .run()
            .unwrap();

        assert!(outcome.is_complete());
        // ART is pinned to p2, so HIST needs p1 and MATH moves to p2.
        assert_eq!(
            slots(&outcome),
            vec![
                ("7A:MATH:1:0".to_string(), "p2"),
                ("7B:ART:1:0".to_string(), "p2"),
                ("7B:HIST:1:0".to_string(), "p1"),
            ]
        );
        // HIST dead-ends once, then ART has nothing left to try
        assert_eq!(outcome.backtracks, 2);
        assert_eq!(outcome.most_difficult, Some(2));
        assert_eq!(outcome.index.placement_count(), 3);
    }

    #[test]
    fn test_progress_events() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();
        let events = RefCell::new(Vec::new());
        let sink = |p: Progress| events.borrow_mut().push(p);

        SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &sink, &cancel)
            .run()
            .unwrap();

        let events = events.into_inner();
        assert!(matches!(
            &events[0],
            Progress::Placing { placed: 0, total: 3, current_lesson } if current_lesson == "MATH ×1 for 7A with T1"
        ));
        let backtracks: Vec<(u64, &str)> = events
            .iter()
            .filter_map(|e| match e {
                Progress::Backtracked {
                    backtracks,
                    most_difficult_lesson,
                    ..
                } => Some((*backtracks, most_difficult_lesson.as_str())),
                _ => None,
            })
            .collect();
        // HIST backtracked first; ART ties it but never overtakes it
        assert_eq!(
            backtracks,
            vec![(1, "HIST ×1 for 7B with T1"), (2, "HIST ×1 for 7B with T1")]
        );
    }

    #[test]
    fn test_progress_interval() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();
        let placing = RefCell::new(0usize);
        let sink = |p: Progress| {
            if matches!(p, Progress::Placing { .. }) {
                *placing.borrow_mut() += 1;
            }
        };

        SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &sink, &cancel)
            .with_progress_interval(1000)
            .run()
            .unwrap();

        assert_eq!(*placing.borrow(), 1);
    }

    #[test]
    fn test_budget_reports_deepest_branch() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();

        let outcome = SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &NoProgress, &cancel)
            .with_max_backtracks(Some(1))
            .run()
            .unwrap();

        assert_eq!(outcome.failed_at, Some(2));
        assert_eq!(outcome.backtracks, 2);
        assert_eq!(
            slots(&outcome),
            vec![("7A:MATH:1:0".to_string(), "p1"), ("7B:ART:1:0".to_string(), "p2")]
        );
        assert_eq!(outcome.index.placement_count(), 2);
    }

    #[test]
    fn test_budget_allows_exactly_limit_backtracks() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();
        let run = |limit: u64| {
            SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &NoProgress, &cancel)
                .with_max_backtracks(Some(limit))
                .run()
                .unwrap()
        };

        let zero = run(0);
        assert_eq!(zero.backtracks, 1);
        assert_eq!(zero.failed_at, Some(2));

        // two backtracks are all the fixture needs
        let two = run(2);
        assert!(two.is_complete());
        assert_eq!(two.backtracks, 2);
    }

    #[test]
    fn test_unplaceable_first_lesson() {
        let request = two_level_request()
            .with_constraint(TimeConstraint::teacher_unavailable("T1", "Mon", "p1"))
            .with_constraint(TimeConstraint::teacher_unavailable("T1", "Mon", "p2"));
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();

        let outcome = SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &NoProgress, &cancel)
            .run()
            .unwrap();

        assert_eq!(outcome.failed_at, Some(0));
        assert!(outcome.placements.is_empty());
        assert_eq!(outcome.index.placement_count(), 0);
    }

    #[test]
    fn test_cancel_unwinds() {
        let request = two_level_request();
        let lessons = lessons_of(&request);
        let catalog = Catalog::new(&request);
        let plans = plan_lessons(&catalog, &lessons);
        let cancel = CancellationToken::new();
        let sink = |_: Progress| cancel.cancel();

        let err = SolverSession::new(&catalog, &plans, OccupancyIndex::new(), &sink, &cancel)
            .run()
            .unwrap_err();
        assert!(matches!(err, TimetableError::Cancelled));
    }

    #[test]
    fn test_empty_queue_succeeds() {
        let request = TimetableRequest::new();
        let catalog = Catalog::new(&request);
        let cancel = CancellationToken::new();

        let outcome = SolverSession::new(&catalog, &[], OccupancyIndex::new(), &NoProgress, &cancel)
            .run()
            .unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.backtracks, 0);
    }
}
