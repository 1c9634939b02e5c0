//! Input validation for timetabling requests.
//!
//! Checks structural integrity of the snapshot before (or while) generating
//! a timetable. Detects:
//! - Duplicate IDs
//! - Class groups without a usable time grid
//! - Allocations, rules, unavailabilities and locks with dangling references
//! - Lesson definitions that can never be placed
//!
//! The engine never rejects a request: records that fail these checks are
//! skipped and reported in [`TimetableResult::skipped`](crate::models::TimetableResult).
//! Callers wanting a strict mode run [`validate_input`] first.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::engine::{Catalog, TimetableRequest};
use crate::models::{LockedLesson, TeacherAllocation, TimeConstraint};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A timetabled class group has no grid, or an unknown one.
    MissingTimeGrid,
    /// A grid has no days or no lesson periods.
    UnusableTimeGrid,
    /// A record references a class group that doesn't exist.
    InvalidClassGroupReference,
    /// A record references a subject that doesn't exist.
    InvalidSubjectReference,
    /// A record references a teacher that doesn't exist.
    InvalidTeacherReference,
    /// More than one subject rule for the same (subject, class group).
    DuplicateSubjectRule,
    /// A lesson definition with zero count or duration, or longer than any
    /// run of lesson periods in the grid.
    InvalidLessonDefinition,
    /// A day or period that no grid defines.
    InvalidSlotReference,
    /// A locked lesson that doesn't fit its class group's grid.
    LockedLessonOutOfGrid,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a timetabling request.
///
/// Checks:
/// 1. No duplicate grid, period (per grid), class group, subject or teacher IDs
/// 2. Grids have at least one day and one lesson period
/// 3. Timetabled class groups reference an existing grid
/// 4. Allocations reference existing class groups, subjects and teachers
/// 5. Subject rules reference existing subjects and class groups, are unique
///    per pair, and only define placeable lessons
/// 6. Teacher unavailabilities reference known teachers, days and periods
/// 7. Locked lessons reference known entities and fit the grid
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(request: &TimetableRequest) -> ValidationResult {
    let mut errors = Vec::new();
    let catalog = Catalog::new(request);

    check_duplicates(request, &mut errors);

    for grid in &request.time_grids {
        if !grid.is_usable() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnusableTimeGrid,
                format!("Time grid '{}' has no days or no lesson periods", grid.id),
            ));
        }
    }

    for cg in request.class_groups.iter().filter(|cg| cg.timetabling_enabled) {
        let known = cg
            .time_grid_id
            .as_deref()
            .is_some_and(|id| catalog.grid(id).is_some());
        if !known {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingTimeGrid,
                format!("Class group '{}' has no known time grid", cg.id),
            ));
        }
    }

    for allocation in &request.allocations {
        if let Some(err) = check_allocation(&catalog, allocation) {
            errors.push(err);
        }
    }

    check_constraints(request, &catalog, &mut errors);

    for lock in &request.locked_lessons {
        if let Some(err) = check_locked_lesson(&catalog, lock) {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duplicates(request: &TimetableRequest, errors: &mut Vec<ValidationError>) {
    push_duplicates("time grid", request.time_grids.iter().map(|g| g.id.as_str()), errors);
    push_duplicates("class group", request.class_groups.iter().map(|c| c.id.as_str()), errors);
    push_duplicates(
        "subject",
        request.academic_structure.subjects.iter().map(|s| s.id.as_str()),
        errors,
    );
    push_duplicates("teacher", request.teachers.iter().map(|t| t.id.as_str()), errors);
    for grid in &request.time_grids {
        push_duplicates(
            &format!("period in grid '{}'", grid.id),
            grid.periods.iter().map(|p| p.id.as_str()),
            errors,
        );
    }
}

fn push_duplicates<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
}

fn check_constraints(request: &TimetableRequest, catalog: &Catalog<'_>, errors: &mut Vec<ValidationError>) {
    let mut rule_pairs = HashSet::new();

    for constraint in &request.time_constraints {
        match constraint {
            TimeConstraint::SubjectRule(rule) => {
                if catalog.subject(&rule.subject_id).is_none() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidSubjectReference,
                        format!("Subject rule references unknown subject '{}'", rule.subject_id),
                    ));
                }
                let class_group = catalog.class_group(&rule.class_group_id);
                if class_group.is_none() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidClassGroupReference,
                        format!(
                            "Subject rule references unknown class group '{}'",
                            rule.class_group_id
                        ),
                    ));
                }
                if !rule_pairs.insert((rule.subject_id.as_str(), rule.class_group_id.as_str())) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicateSubjectRule,
                        format!(
                            "More than one subject rule for '{}' in class group '{}'; the first one is used",
                            rule.subject_id, rule.class_group_id
                        ),
                    ));
                }

                let longest_run = class_group
                    .and_then(|cg| catalog.grid_of(cg))
                    .map(|grid| grid.longest_lesson_run());
                for def in &rule.lessons {
                    if def.count == 0 || def.duration == 0 {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::InvalidLessonDefinition,
                            format!(
                                "Subject rule for '{}' in '{}' defines {} lessons of {} periods",
                                rule.subject_id, rule.class_group_id, def.count, def.duration
                            ),
                        ));
                    } else if longest_run.is_some_and(|run| def.duration as usize > run) {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::InvalidLessonDefinition,
                            format!(
                                "Lessons of {} periods for '{}' in '{}' exceed every run of lesson periods",
                                def.duration, rule.subject_id, rule.class_group_id
                            ),
                        ));
                    }
                }
            }
            TimeConstraint::TeacherUnavailability {
                teacher_id,
                day,
                period_id,
            } => {
                if catalog.teacher(teacher_id).is_none() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidTeacherReference,
                        format!("Unavailability references unknown teacher '{teacher_id}'"),
                    ));
                }
                let slot_known = request
                    .time_grids
                    .iter()
                    .any(|g| g.has_day(day) && g.period_index(period_id).is_some());
                if !slot_known {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidSlotReference,
                        format!("No time grid has day '{day}' with period '{period_id}'"),
                    ));
                }
            }
            TimeConstraint::TeacherLoad { teacher_id, .. } => {
                if catalog.teacher(teacher_id).is_none() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidTeacherReference,
                        format!("Teacher load references unknown teacher '{teacher_id}'"),
                    ));
                }
            }
        }
    }
}

/// Checks the references of one allocation.
///
/// Returns the first problem found.
pub(crate) fn check_allocation(catalog: &Catalog<'_>, allocation: &TeacherAllocation) -> Option<ValidationError> {
    if catalog.class_group(&allocation.class_group_id).is_none() {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidClassGroupReference,
            format!(
                "Allocation of teacher '{}' for '{}' references unknown class group '{}'",
                allocation.teacher_id, allocation.subject_id, allocation.class_group_id
            ),
        ));
    }
    if catalog.subject(&allocation.subject_id).is_none() {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidSubjectReference,
            format!(
                "Allocation of teacher '{}' to '{}' references unknown subject '{}'",
                allocation.teacher_id, allocation.class_group_id, allocation.subject_id
            ),
        ));
    }
    if catalog.teacher(&allocation.teacher_id).is_none() {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidTeacherReference,
            format!(
                "Allocation of '{}' to '{}' references unknown teacher '{}'",
                allocation.subject_id, allocation.class_group_id, allocation.teacher_id
            ),
        ));
    }
    None
}

/// Checks the references and fit of one locked lesson.
pub(crate) fn check_locked_lesson(catalog: &Catalog<'_>, lock: &LockedLesson) -> Option<ValidationError> {
    let Some(class_group) = catalog.class_group(&lock.class_group_id) else {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidClassGroupReference,
            format!("Locked lesson references unknown class group '{}'", lock.class_group_id),
        ));
    };
    if catalog.subject(&lock.subject_id).is_none() {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidSubjectReference,
            format!("Locked lesson references unknown subject '{}'", lock.subject_id),
        ));
    }
    if catalog.teacher(&lock.teacher_id).is_none() {
        return Some(ValidationError::new(
            ValidationErrorKind::InvalidTeacherReference,
            format!("Locked lesson references unknown teacher '{}'", lock.teacher_id),
        ));
    }
    let Some(grid) = catalog.grid_of(class_group) else {
        return Some(ValidationError::new(
            ValidationErrorKind::MissingTimeGrid,
            format!("Locked lesson class group '{}' has no known time grid", lock.class_group_id),
        ));
    };
    let fits = grid.has_day(&lock.day)
        && grid
            .period_index(&lock.period_id)
            .is_some_and(|start| grid.fits(start, lock.duration as usize));
    if !fits {
        return Some(ValidationError::new(
            ValidationErrorKind::LockedLessonOutOfGrid,
            format!(
                "Locked lesson '{}' in '{}' at {} {} for {} periods does not fit grid '{}'",
                lock.subject_id, lock.class_group_id, lock.day, lock.period_id, lock.duration, grid.id
            ),
        ));
    }
    None
}
