//! Timetable audit.
//!
//! Re-checks a finished timetable against the request it was built from.
//! The engine never produces these conflicts itself; the audit is for
//! timetables that were edited by hand, imported, or assembled from locks.
//!
//! Detects:
//! - Teachers in two class groups in the same period
//! - Cells shared by incompatible subjects (core with anything, electives
//!   of different groups)
//! - Lessons in periods their teacher declared unavailable
//! - Subjects over their per-day cap
//! - Slots in break periods
//! - Locked lessons that claim the same cell or teacher

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::{Catalog, TimetableRequest};
use crate::models::{
    Conflict, ConflictDetails, ConflictKind, GeneratedSlot, GeneratedTimetable, LockedLesson,
    SubjectCategory,
};
use crate::validation::check_locked_lesson;

/// Audits a timetable. Conflicts come out in a deterministic order.
pub fn audit_timetable(request: &TimetableRequest, timetable: &GeneratedTimetable) -> Vec<Conflict> {
    let catalog = Catalog::new(request);
    let mut conflicts = Vec::new();

    check_double_booking(timetable, &mut conflicts);
    check_cells(&catalog, timetable, &mut conflicts);
    check_daily_caps(&catalog, timetable, &mut conflicts);
    check_locked_overlaps(&catalog, request, &mut conflicts);

    conflicts
}

fn slot_details(slot: &GeneratedSlot, day: &str, period_id: &str) -> ConflictDetails {
    ConflictDetails {
        class_group_id: slot.class_group_id.clone(),
        subject_id: slot.subject_id.clone(),
        teacher_id: slot.teacher_id.clone(),
        lesson_id: Some(slot.id.clone()),
        day: Some(day.to_string()),
        period_id: Some(period_id.to_string()),
    }
}

fn check_double_booking(timetable: &GeneratedTimetable, conflicts: &mut Vec<Conflict>) {
    // (teacher, day, period) → class groups
    let mut bookings: BTreeMap<(&str, &str, &str), BTreeMap<&str, &GeneratedSlot>> = BTreeMap::new();
    for (cg, day, period, slots) in timetable.iter() {
        for slot in slots {
            bookings
                .entry((slot.teacher_id.as_str(), day, period))
                .or_default()
                .entry(cg)
                .or_insert(slot);
        }
    }

    for ((teacher, day, period), groups) in bookings {
        if groups.len() < 2 {
            continue;
        }
        let names: Vec<&str> = groups.keys().copied().collect();
        let Some(first) = groups.values().next() else {
            continue;
        };
        conflicts.push(Conflict::new(
            ConflictKind::TeacherDoubleBooked,
            &format!("{teacher}:{day}:{period}"),
            format!(
                "Teacher {teacher} is booked for {} at {day} {period}",
                names.join(", ")
            ),
            slot_details(first, day, period),
        ));
    }
}

fn check_cells(catalog: &Catalog<'_>, timetable: &GeneratedTimetable, conflicts: &mut Vec<Conflict>) {
    for (cg, day, period, slots) in timetable.iter() {
        let grid = catalog.class_group(cg).and_then(|c| catalog.grid_of(c));
        let is_break = grid
            .and_then(|g| g.period_index(period).map(|i| !g.periods[i].is_lesson()))
            .unwrap_or(false);

        for slot in slots {
            if is_break {
                conflicts.push(Conflict::new(
                    ConflictKind::ConstraintViolation,
                    &format!("break:{}:{day}:{period}", slot.id),
                    format!("{} is scheduled in break period {period} on {day}", slot.id),
                    slot_details(slot, day, period),
                ));
            }
            if catalog.is_unavailable(&slot.teacher_id, day, period) {
                conflicts.push(Conflict::new(
                    ConflictKind::ConstraintViolation,
                    &format!("unavailable:{}:{day}:{period}", slot.id),
                    format!(
                        "Teacher {} is unavailable at {day} {period} but teaches {}",
                        slot.teacher_id, slot.subject_id
                    ),
                    slot_details(slot, day, period),
                ));
            }
        }

        if slots.len() < 2 {
            continue;
        }
        let kinds: Vec<(SubjectCategory, Option<&str>)> = slots
            .iter()
            .map(|s| match catalog.subject(&s.subject_id) {
                Some(subject) => (subject.category, subject.elective_group.as_deref()),
                None => (SubjectCategory::Core, None),
            })
            .collect();
        let any_core = kinds.iter().any(|(c, _)| *c == SubjectCategory::Core);
        let groups: BTreeSet<Option<&str>> = kinds.iter().map(|(_, g)| *g).collect();
        if any_core || groups.len() > 1 {
            let subjects: Vec<&str> = slots.iter().map(|s| s.subject_id.as_str()).collect();
            conflicts.push(Conflict::new(
                ConflictKind::ConstraintViolation,
                &format!("shared:{cg}:{day}:{period}"),
                format!(
                    "{cg} has incompatible subjects {} at {day} {period}",
                    subjects.join(", ")
                ),
                slot_details(&slots[0], day, period),
            ));
        }
    }
}

fn check_daily_caps(catalog: &Catalog<'_>, timetable: &GeneratedTimetable, conflicts: &mut Vec<Conflict>) {
    // (class group, subject, day) → periods
    let mut per_day: BTreeMap<(&str, &str, &str), (u32, &GeneratedSlot)> = BTreeMap::new();
    for (cg, day, _, slots) in timetable.iter() {
        let subjects: BTreeMap<&str, &GeneratedSlot> =
            slots.iter().map(|s| (s.subject_id.as_str(), s)).collect();
        for (subject, slot) in subjects {
            per_day.entry((cg, subject, day)).or_insert((0, slot)).0 += 1;
        }
    }

    for ((cg, subject, day), (periods, slot)) in per_day {
        let Some(cap) = catalog
            .subject_rule(subject, cg)
            .and_then(|rule| rule.max_periods_per_day)
        else {
            continue;
        };
        if periods > cap {
            conflicts.push(Conflict::new(
                ConflictKind::ConstraintViolation,
                &format!("cap:{cg}:{subject}:{day}"),
                format!("{subject} has {periods} periods in {cg} on {day}, cap is {cap}"),
                ConflictDetails {
                    class_group_id: cg.to_string(),
                    subject_id: subject.to_string(),
                    teacher_id: slot.teacher_id.clone(),
                    day: Some(day.to_string()),
                    ..ConflictDetails::default()
                },
            ));
        }
    }
}

fn check_locked_overlaps(catalog: &Catalog<'_>, request: &TimetableRequest, conflicts: &mut Vec<Conflict>) {
    // every (day, period) each valid lock covers
    let mut covered: Vec<(&LockedLesson, Vec<&str>)> = Vec::new();
    for lock in &request.locked_lessons {
        if check_locked_lesson(catalog, lock).is_some() {
            continue;
        }
        let Some(grid) = catalog
            .class_group(&lock.class_group_id)
            .and_then(|cg| catalog.grid_of(cg))
        else {
            continue;
        };
        let Some(start) = grid.period_index(&lock.period_id) else {
            continue;
        };
        let periods = grid.periods[start..start + lock.duration as usize]
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        covered.push((lock, periods));
    }

    for (i, (a, a_periods)) in covered.iter().enumerate() {
        for (b, b_periods) in &covered[i + 1..] {
            if a.day != b.day {
                continue;
            }
            let Some(shared) = a_periods.iter().find(|p| b_periods.contains(*p)) else {
                continue;
            };
            let same_cell = a.class_group_id == b.class_group_id;
            let same_teacher = a.teacher_id == b.teacher_id;
            if !same_cell && !same_teacher {
                continue;
            }
            let what = if same_cell {
                format!("class group {}", a.class_group_id)
            } else {
                format!("teacher {}", a.teacher_id)
            };
            conflicts.push(Conflict::new(
                ConflictKind::LockedLessonOverlap,
                &format!("{}|{}", a.slot_id(), b.slot_id()),
                format!(
                    "Locked lessons {} and {} both claim {what} at {} {shared}",
                    a.subject_id, b.subject_id, a.day
                ),
                ConflictDetails {
                    class_group_id: b.class_group_id.clone(),
                    subject_id: b.subject_id.clone(),
                    teacher_id: b.teacher_id.clone(),
                    lesson_id: Some(b.slot_id()),
                    day: Some(b.day.clone()),
                    period_id: Some(shared.to_string()),
                },
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CancellationToken, NoProgress, TimetableEngine};
    use crate::models::{ClassGroup, Period, Subject, SubjectRule, Teacher, TimeConstraint, TimeGrid};

    fn request() -> TimetableRequest {
        TimetableRequest::new()
            .with_time_grid(
                TimeGrid::new("g1")
                    .with_day("Mon")
                    .with_period(Period::lesson("p1", "08:00", "08:45"))
                    .with_period(Period::break_period("brk", "08:45", "09:00"))
                    .with_period(Period::lesson("p2", "09:00", "09:45")),
            )
            .with_class_group(ClassGroup::new("7A", "g1"))
            .with_class_group(ClassGroup::new("7B", "g1"))
            .with_subject(Subject::core("MATH"))
            .with_subject(Subject::elective("ART", "a"))
            .with_subject(Subject::elective("MUSIC", "a"))
            .with_subject(Subject::elective("DRAMA", "b"))
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_teacher(Teacher::new("T3"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(2, 1).with_max_periods_per_day(1))
            .with_constraint(TimeConstraint::teacher_unavailable("T3", "Mon", "p2"))
    }

    fn slot(id: &str, cg: &str, subject: &str, teacher: &str) -> GeneratedSlot {
        GeneratedSlot {
            id: id.into(),
            class_group_id: cg.into(),
            subject_id: subject.into(),
            teacher_id: teacher.into(),
        }
    }

    fn kinds(conflicts: &[Conflict]) -> Vec<ConflictKind> {
        conflicts.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_clean_timetable() {
        let mut tt = GeneratedTimetable::new();
        tt.push("7A", "Mon", "p1", slot("a1", "7A", "ART", "T1"));
        tt.push("7A", "Mon", "p1", slot("m1", "7A", "MUSIC", "T2"));
        tt.push("7B", "Mon", "p1", slot("x1", "7B", "MATH", "T3"));
        assert!(audit_timetable(&request(), &tt).is_empty());
    }

    #[test]
    fn test_double_booking() {
        let mut tt = GeneratedTimetable::new();
        tt.push("7A", "Mon", "p1", slot("m1", "7A", "MATH", "T1"));
        tt.push("7B", "Mon", "p1", slot("m2", "7B", "MATH", "T1"));

        let conflicts = audit_timetable(&request(), &tt);
        assert_eq!(kinds(&conflicts), vec![ConflictKind::TeacherDoubleBooked]);
        assert_eq!(conflicts[0].id, "double-booked:T1:Mon:p1");
        assert!(conflicts[0].message.contains("7A, 7B"));
    }

    #[test]
    fn test_incompatible_cell() {
        let mut tt = GeneratedTimetable::new();
        tt.push("7A", "Mon", "p1", slot("a1", "7A", "ART", "T1"));
        tt.push("7A", "Mon", "p1", slot("d1", "7A", "DRAMA", "T2"));
        tt.push("7B", "Mon", "p1", slot("m1", "7B", "MATH", "T3"));
        tt.push("7B", "Mon", "p1", slot("a2", "7B", "ART", "T1"));

        let conflicts = audit_timetable(&request(), &tt);
        // T1 in both groups, plus two incompatible cells
        assert_eq!(
            kinds(&conflicts),
            vec![
                ConflictKind::TeacherDoubleBooked,
                ConflictKind::ConstraintViolation,
                ConflictKind::ConstraintViolation
            ]
        );
    }

    #[test]
    fn test_unavailable_break_and_cap() {
        let mut tt = GeneratedTimetable::new();
        tt.push("7B", "Mon", "p2", slot("x", "7B", "MATH", "T3"));
        tt.push("7A", "Mon", "p1", slot("m1", "7A", "MATH", "T1"));
        tt.push("7A", "Mon", "p2", slot("m2", "7A", "MATH", "T1"));
        tt.push("7A", "Mon", "brk", slot("m3", "7A", "ART", "T2"));

        let conflicts = audit_timetable(&request(), &tt);
        let ids: Vec<&str> = conflicts.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"violation:unavailable:x:Mon:p2"));
        assert!(ids.contains(&"violation:break:m3:Mon:brk"));
        assert!(ids.contains(&"violation:cap:7A:MATH:Mon"));
        assert_eq!(conflicts.len(), 3);
    }

    #[test]
    fn test_locked_overlap() {
        let request = request()
            .with_locked_lesson(LockedLesson::new("7A", "MATH", "T1", "Mon", "p1"))
            .with_locked_lesson(LockedLesson::new("7B", "DRAMA", "T1", "Mon", "p1"))
            .with_locked_lesson(LockedLesson::new("7B", "ART", "T2", "Mon", "p2"));

        let conflicts = audit_timetable(&request, &GeneratedTimetable::new());
        assert_eq!(kinds(&conflicts), vec![ConflictKind::LockedLessonOverlap]);
        assert!(conflicts[0].message.contains("teacher T1"));
    }

    #[test]
    fn test_engine_output_passes_audit() {
        let request = request()
            .with_allocation(crate::models::TeacherAllocation::new("T1", "7A", "MATH"))
            .with_allocation(crate::models::TeacherAllocation::new("T3", "7B", "MATH"))
            .with_constraint(SubjectRule::new("MATH", "7B").with_lessons(2, 1));

        let result = TimetableEngine::default()
            .solve(&request, &NoProgress, &CancellationToken::new())
            .unwrap();
        assert!(audit_timetable(&request, &result.timetable).is_empty());
    }
}
