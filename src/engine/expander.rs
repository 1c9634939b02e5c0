//! Lesson expansion.
//!
//! Turns allocations plus subject rules into the ordered lesson queue.
//!
//! # Algorithm
//! For each allocation, in input order:
//! 1. Skip (and report) it if it references an unknown class group,
//!    subject or teacher, or its class group has no usable grid.
//! 2. Skip it silently if its class group is not timetabled, or no subject
//!    rule exists for its (subject, class group).
//! 3. For each lesson definition of the rule, emit `count` lessons of
//!    `duration` periods. Definitions with a zero count or duration, or
//!    longer than every run of lesson periods in the grid, are skipped and
//!    reported.
//!
//! The queue order is the search order, so it is kept exactly as produced.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{Catalog, TimetableRequest};
use crate::models::Lesson;
use crate::validation::{check_allocation, ValidationError, ValidationErrorKind};

/// Output of lesson expansion.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Lessons to place, in search order.
    pub lessons: Vec<Lesson>,
    /// Lessons withheld because a locked lesson covers their
    /// (subject, class group).
    pub excluded_by_lock: usize,
    /// Input records that were skipped as malformed.
    pub skipped: Vec<ValidationError>,
}

/// Expands allocations into lessons.
///
/// `locked_pairs` holds the (subject, class group) pairs of the locked
/// lessons written into the timetable; every lesson of such a pair is left
/// out of the queue.
pub fn expand_lessons(
    catalog: &Catalog<'_>,
    request: &TimetableRequest,
    locked_pairs: &HashSet<(&str, &str)>,
) -> Expansion {
    let mut out = Expansion::default();
    let mut occurrences: HashMap<(&str, &str, usize), usize> = HashMap::new();

    for allocation in &request.allocations {
        if let Some(err) = check_allocation(catalog, allocation) {
            warn!(reason = %err.message, "skipping allocation");
            out.skipped.push(err);
            continue;
        }

        let cg_id = allocation.class_group_id.as_str();
        let subject_id = allocation.subject_id.as_str();

        let Some((_, grid)) = catalog.schedulable(cg_id) else {
            let enabled = catalog
                .class_group(cg_id)
                .is_some_and(|cg| cg.timetabling_enabled);
            if enabled {
                let err = ValidationError::new(
                    ValidationErrorKind::MissingTimeGrid,
                    format!(
                        "Allocation of '{subject_id}' to '{cg_id}' skipped: class group has no usable time grid"
                    ),
                );
                warn!(reason = %err.message, "skipping allocation");
                out.skipped.push(err);
            } else {
                debug!(class_group = cg_id, "class group not timetabled");
            }
            continue;
        };
        let longest_run = grid.longest_lesson_run();

        let Some(rule) = catalog.subject_rule(subject_id, cg_id) else {
            debug!(
                class_group = cg_id,
                subject = subject_id,
                "no subject rule, allocation yields no lessons"
            );
            continue;
        };

        for def in &rule.lessons {
            if def.count == 0 || def.duration == 0 {
                out.skipped.push(ValidationError::new(
                    ValidationErrorKind::InvalidLessonDefinition,
                    format!(
                        "Subject rule for '{subject_id}' in '{cg_id}' defines {} lessons of {} periods",
                        def.count, def.duration
                    ),
                ));
                continue;
            }

            let duration = def.duration as usize;
            if duration > longest_run {
                let err = ValidationError::new(
                    ValidationErrorKind::InvalidLessonDefinition,
                    format!(
                        "Lessons of {duration} periods for '{subject_id}' in '{cg_id}' exceed every run of lesson periods in grid '{}'",
                        grid.id
                    ),
                );
                warn!(reason = %err.message, "skipping lesson definition");
                out.skipped.push(err);
                continue;
            }

            for _ in 0..def.count {
                let n = occurrences.entry((cg_id, subject_id, duration)).or_insert(0);
                let lesson = Lesson::new(
                    Lesson::make_id(cg_id, subject_id, duration, *n),
                    cg_id,
                    subject_id,
                    allocation.teacher_id.as_str(),
                    duration,
                );
                *n += 1;

                if locked_pairs.contains(&(subject_id, cg_id)) {
                    out.excluded_by_lock += 1;
                } else {
                    out.lessons.push(lesson);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AcademicStructure, ClassGroup, Period, Subject, SubjectRule, Teacher, TeacherAllocation,
        TimeGrid,
    };

    fn base_request() -> TimetableRequest {
        TimetableRequest::new()
            .with_time_grid(
                TimeGrid::new("g1")
                    .with_days(["Mon", "Tue"])
                    .with_period(Period::lesson("p1", "08:00", "08:45"))
                    .with_period(Period::lesson("p2", "08:50", "09:35")),
            )
            .with_class_group(ClassGroup::new("7A", "g1"))
            .with_class_group(ClassGroup::new("7B", "g1").disabled())
            .with_academic_structure(AcademicStructure::with_subjects(vec![
                Subject::core("MATH"),
                Subject::core("HIST"),
            ]))
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
    }

    fn expand(request: &TimetableRequest) -> Expansion {
        let catalog = Catalog::new(request);
        expand_lessons(&catalog, request, &HashSet::new())
    }

    #[test]
    fn test_counts_and_durations() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(2, 1).with_lessons(1, 2));

        let out = expand(&request);
        let ids: Vec<_> = out.lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["7A:MATH:1:0", "7A:MATH:1:1", "7A:MATH:2:0"]);
        assert_eq!(out.lessons[2].duration, 2);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_ids_unique_across_allocations() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_allocation(TeacherAllocation::new("T2", "7A", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(1, 1));

        let out = expand(&request);
        assert_eq!(out.lessons.len(), 2);
        assert_eq!(out.lessons[0].id, "7A:MATH:1:0");
        assert_eq!(out.lessons[1].id, "7A:MATH:1:1");
        assert_eq!(out.lessons[1].teacher_id, "T2");
    }

    #[test]
    fn test_no_rule_yields_nothing_silently() {
        let request = base_request().with_allocation(TeacherAllocation::new("T1", "7A", "HIST"));
        let out = expand(&request);
        assert!(out.lessons.is_empty());
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_disabled_group_skipped_silently() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7B", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7B").with_lessons(3, 1));
        let out = expand(&request);
        assert!(out.lessons.is_empty());
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_malformed_allocation_reported() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T9", "7A", "MATH"))
            .with_allocation(TeacherAllocation::new("T1", "9Z", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(1, 1));

        let out = expand(&request);
        assert!(out.lessons.is_empty());
        assert_eq!(out.skipped.len(), 2);
        assert_eq!(out.skipped[0].kind, ValidationErrorKind::InvalidTeacherReference);
        assert_eq!(out.skipped[1].kind, ValidationErrorKind::InvalidClassGroupReference);
    }

    #[test]
    fn test_locked_pair_excluded() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_allocation(TeacherAllocation::new("T2", "7A", "HIST"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(3, 1))
            .with_constraint(SubjectRule::new("HIST", "7A").with_lessons(1, 1));

        let catalog = Catalog::new(&request);
        let locked: HashSet<(&str, &str)> = [("MATH", "7A")].into_iter().collect();
        let out = expand_lessons(&catalog, &request, &locked);

        assert_eq!(out.excluded_by_lock, 3);
        assert_eq!(out.lessons.len(), 1);
        assert_eq!(out.lessons[0].subject_id, "HIST");
    }

    #[test]
    fn test_overlong_definition_reported() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(1, 3).with_lessons(2, 1));

        let out = expand(&request);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].kind, ValidationErrorKind::InvalidLessonDefinition);
        let ids: Vec<_> = out.lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["7A:MATH:1:0", "7A:MATH:1:1"]);
    }

    #[test]
    fn test_zero_definition_reported() {
        let request = base_request()
            .with_allocation(TeacherAllocation::new("T1", "7A", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(2, 0));
        let out = expand(&request);
        assert!(out.lessons.is_empty());
        assert_eq!(out.skipped[0].kind, ValidationErrorKind::InvalidLessonDefinition);
    }
}
