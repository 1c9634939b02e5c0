//! Demo school generator.
//!
//! Builds a deterministic, realistic [`TimetableRequest`] for benchmarks and
//! invariant tests. The same size always yields the same request.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::TimetableRequest;
use crate::models::{
    ClassGroup, LockedLesson, Period, Subject, SubjectRule, Teacher, TeacherAllocation,
    TimeConstraint, TimeGrid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoSize {
    Small,
    Large,
}

impl std::str::FromStr for DemoSize {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoSize::Small),
            "LARGE" => Ok(DemoSize::Large),
            _ => Err(()),
        }
    }
}

impl DemoSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoSize::Small => "SMALL",
            DemoSize::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoParameters {
        match self {
            DemoSize::Small => DemoParameters {
                grades: &["7"],
                sections: &["A", "B", "C"],
                lesson_periods: 6,
                unavailable_per_teacher: 1,
                disabled_groups: 0,
            },
            DemoSize::Large => DemoParameters {
                grades: &["7", "8", "9", "10"],
                sections: &["A", "B", "C"],
                lesson_periods: 7,
                unavailable_per_teacher: 2,
                disabled_groups: 1,
            },
        }
    }
}

struct DemoParameters {
    grades: &'static [&'static str],
    sections: &'static [&'static str],
    lesson_periods: usize,
    unavailable_per_teacher: usize,
    disabled_groups: usize,
}

/// (id, name, elective group, lesson definitions as (count, duration), daily cap)
type SubjectPlan = (&'static str, &'static str, Option<&'static str>, &'static [(u32, u32)], Option<u32>);

const SUBJECTS: &[SubjectPlan] = &[
    ("MATH", "Mathematics", None, &[(4, 1)], Some(1)),
    ("ENG", "English", None, &[(3, 1)], Some(1)),
    ("SCI", "Science", None, &[(1, 2), (1, 1)], Some(2)),
    ("HIST", "History", None, &[(2, 1)], Some(1)),
    ("PE", "Physical Education", None, &[(1, 2)], None),
    ("ART", "Art", Some("arts"), &[(2, 1)], Some(1)),
    ("MUSIC", "Music", Some("arts"), &[(2, 1)], Some(1)),
];

/// Class groups one teacher covers for a subject.
const CLASSES_PER_TEACHER: usize = 2;

const DAYS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri"];

/// List of available demo sizes.
pub fn list_demo_sizes() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Generates a demo school for the given size.
pub fn generate(size: DemoSize) -> TimetableRequest {
    let params = size.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let grid = standard_grid(params.lesson_periods);
    let lesson_period_ids: Vec<String> = grid
        .periods
        .iter()
        .filter(|p| p.is_lesson())
        .map(|p| p.id.clone())
        .collect();

    let mut request = TimetableRequest::new().with_academic_year("2025/26");

    // Class groups, grade by grade
    let mut class_ids = Vec::new();
    for grade in params.grades {
        for section in params.sections {
            let id = format!("{grade}{section}");
            request = request.with_class_group(
                ClassGroup::new(&id, &grid.id)
                    .with_name(format!("Year {grade} {section}"))
                    .with_curriculum("national", *grade)
                    .with_mode("day"),
            );
            class_ids.push(id);
        }
    }
    for i in 0..params.disabled_groups {
        request = request.with_class_group(
            ClassGroup::new(format!("X{i}"), &grid.id)
                .with_name("Exam group")
                .disabled(),
        );
    }

    for &(id, name, group, _, _) in SUBJECTS {
        let subject = match group {
            Some(group) => Subject::elective(id, group),
            None => Subject::core(id),
        };
        request = request.with_subject(subject.with_name(name));
    }

    // Teachers: one per subject per CLASSES_PER_TEACHER class groups
    let names = generate_name_permutations(&mut rng);
    let mut teacher_count = 0;
    for &(subject_id, _, _, lessons, cap) in SUBJECTS {
        for (i, chunk) in class_ids.chunks(CLASSES_PER_TEACHER).enumerate() {
            let teacher_id = format!("{subject_id}-{}", i + 1);
            let name = names[teacher_count % names.len()].clone();
            teacher_count += 1;
            request = request.with_teacher(Teacher::new(&teacher_id).with_name(name));

            for cg in chunk {
                request = request.with_allocation(TeacherAllocation::new(&teacher_id, cg, subject_id));
                let mut rule = SubjectRule::new(subject_id, cg);
                for &(count, duration) in lessons {
                    rule = rule.with_lessons(count, duration);
                }
                if let Some(cap) = cap {
                    rule = rule.with_max_periods_per_day(cap);
                }
                request = request.with_constraint(rule);
            }
        }
    }

    // Random unavailability, never on the first period so every teacher
    // keeps at least one slot a day
    let teacher_ids: Vec<String> = request.teachers.iter().map(|t| t.id.clone()).collect();
    for teacher_id in &teacher_ids {
        for _ in 0..params.unavailable_per_teacher {
            let day = DAYS[rng.random_range(0..DAYS.len())];
            let period = &lesson_period_ids[rng.random_range(1..lesson_period_ids.len())];
            request = request.with_constraint(TimeConstraint::teacher_unavailable(
                teacher_id.as_str(),
                day,
                period.as_str(),
            ));
        }
    }

    // Lock PE for the first class group on a day its teacher is free at p1
    if let Some(first) = class_ids.first() {
        let pe = request
            .allocations
            .iter()
            .find(|a| a.class_group_id == *first && a.subject_id == "PE")
            .map(|a| a.teacher_id.clone());
        if let Some(teacher_id) = pe {
            let free_days: Vec<&str> = DAYS
                .iter()
                .copied()
                .filter(|day| {
                    !request.time_constraints.iter().any(|c| {
                        matches!(c, TimeConstraint::TeacherUnavailability { teacher_id: t, day: d, period_id }
                            if *t == teacher_id && d == day && (period_id == "p1" || period_id == "p2"))
                    })
                })
                .collect();
            if let Some(day) = free_days.choose(&mut rng) {
                let lock = LockedLesson::new(first.as_str(), "PE", teacher_id.as_str(), *day, "p1").with_duration(2);
                request = request.with_locked_lesson(lock);
            }
        }
    }

    request.with_time_grid(grid)
}

/// Five days of `lesson_periods` 45-minute lessons with a break after the
/// third.
fn standard_grid(lesson_periods: usize) -> TimeGrid {
    let mut grid = TimeGrid::new("standard")
        .with_name("Standard week")
        .with_days(DAYS.iter().copied())
        .with_color("#4f86c6");
    let mut minute = 8 * 60;
    for i in 1..=lesson_periods {
        grid = grid.with_period(Period::lesson(format!("p{i}"), clock(minute), clock(minute + 45)));
        minute += 50;
        if i == 3 {
            grid = grid.with_period(Period::break_period("break", clock(minute), clock(minute + 20)));
            minute += 20;
        }
    }
    grid
}

fn clock(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

const FIRST_NAMES: &[&str] = &[
    "Amy", "Beth", "Carl", "Dan", "Elsa", "Flo", "Gus", "Hugo", "Ivy", "Jay",
];
const LAST_NAMES: &[&str] = &[
    "Cole", "Fox", "Green", "Jones", "King", "Li", "Poe", "Rye", "Smith", "Watt",
];

fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{first} {last}"));
        }
    }
    names.shuffle(rng);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::audit_timetable;
    use crate::config::EngineConfig;
    use crate::engine::{CancellationToken, NoProgress, TimetableEngine};
    use crate::models::{ConflictKind, SubjectCategory};
    use crate::validation::validate_input;
    use std::collections::HashMap;

    fn engine() -> TimetableEngine {
        TimetableEngine::new(EngineConfig::default().with_max_backtracks(20_000))
    }

    #[test]
    fn test_generate_small() {
        let request = generate(DemoSize::Small);
        assert_eq!(request.class_groups.len(), 3);
        assert_eq!(request.academic_structure.subjects.len(), SUBJECTS.len());
        // 7 subjects × 2 teachers (3 groups, 2 per teacher)
        assert_eq!(request.teachers.len(), 14);
        assert_eq!(request.allocations.len(), 21);
        assert_eq!(request.locked_lessons.len(), 1);
        assert!(validate_input(&request).is_ok());
    }

    #[test]
    fn test_generate_large() {
        let request = generate(DemoSize::Large);
        assert_eq!(request.class_groups.len(), 13);
        assert!(request.class_groups.iter().any(|cg| !cg.timetabling_enabled));
        assert!(validate_input(&request).is_ok());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = serde_json::to_string(&generate(DemoSize::Small)).unwrap();
        let b = serde_json::to_string(&generate(DemoSize::Small)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("small".parse::<DemoSize>(), Ok(DemoSize::Small));
        assert_eq!("LARGE".parse::<DemoSize>(), Ok(DemoSize::Large));
        assert!("huge".parse::<DemoSize>().is_err());
        assert_eq!(list_demo_sizes(), vec![DemoSize::Small.as_str(), DemoSize::Large.as_str()]);
    }

    #[test]
    fn test_solved_timetable_invariants() {
        let request = generate(DemoSize::Small);
        let result = engine()
            .solve(&request, &NoProgress, &CancellationToken::new())
            .unwrap();
        assert!(result.lessons_placed > 0);

        // no double booking, no incompatible cells, no broken caps
        assert!(audit_timetable(&request, &result.timetable).is_empty());

        // every placed lesson covers `duration` consecutive lesson periods of one day
        let grid = &request.time_grids[0];
        let mut footprints: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
        for (_, day, period, slots) in result.timetable.iter() {
            let index = grid.period_index(period).unwrap();
            for slot in slots {
                assert!(grid.periods[index].is_lesson());
                footprints.entry(slot.id.as_str()).or_default().push((day, index));
            }
        }
        for (id, mut cells) in footprints {
            cells.sort();
            assert!(cells.windows(2).all(|w| w[0].0 == w[1].0 && w[1].1 == w[0].1 + 1), "{id} is split");
            if !id.starts_with("locked:") {
                let duration: usize = id.rsplit(':').nth(1).unwrap().parse().unwrap();
                assert_eq!(cells.len(), duration, "{id}");
            }
        }

        // conflicts only ever describe unplaced lessons
        assert_eq!(
            result.conflicts_of(ConflictKind::PlacementFailure).count(),
            result.lessons_total - result.lessons_placed
        );
    }

    #[test]
    fn test_electives_only_share_within_group() {
        let request = generate(DemoSize::Small);
        let result = engine()
            .solve(&request, &NoProgress, &CancellationToken::new())
            .unwrap();

        for (_, _, _, slots) in result.timetable.iter() {
            if slots.len() > 1 {
                for slot in slots {
                    let subject = request.academic_structure.subject(&slot.subject_id).unwrap();
                    assert_eq!(subject.category, SubjectCategory::Elective);
                    assert_eq!(subject.elective_group.as_deref(), Some("arts"));
                }
            }
        }
    }

    #[test]
    fn test_solve_is_deterministic() {
        let request = generate(DemoSize::Small);
        let first = engine()
            .solve(&request, &NoProgress, &CancellationToken::new())
            .unwrap();
        let second = engine()
            .solve(&request, &NoProgress, &CancellationToken::new())
            .unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
