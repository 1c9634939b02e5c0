//! Id lookups over a request snapshot.
//!
//! Built once per run. On duplicate ids the first record wins, matching
//! what [`validate_input`](crate::validation::validate_input) reports.

use std::collections::{HashMap, HashSet};

use super::TimetableRequest;
use crate::models::{ClassGroup, Lesson, Subject, SubjectRule, Teacher, TimeConstraint, TimeGrid};

/// Borrowed indexes over a [`TimetableRequest`].
#[derive(Debug)]
pub struct Catalog<'a> {
    grids: HashMap<&'a str, &'a TimeGrid>,
    class_groups: HashMap<&'a str, &'a ClassGroup>,
    subjects: HashMap<&'a str, &'a Subject>,
    teachers: HashMap<&'a str, &'a Teacher>,
    /// (subject, class group) → first matching rule.
    subject_rules: HashMap<(&'a str, &'a str), &'a SubjectRule>,
    /// (teacher, day, period).
    unavailable: HashSet<(&'a str, &'a str, &'a str)>,
}

impl<'a> Catalog<'a> {
    /// Indexes a request.
    pub fn new(request: &'a TimetableRequest) -> Self {
        let mut grids = HashMap::new();
        for g in &request.time_grids {
            grids.entry(g.id.as_str()).or_insert(g);
        }
        let mut class_groups = HashMap::new();
        for cg in &request.class_groups {
            class_groups.entry(cg.id.as_str()).or_insert(cg);
        }
        let mut subjects = HashMap::new();
        for s in &request.academic_structure.subjects {
            subjects.entry(s.id.as_str()).or_insert(s);
        }
        let mut teachers = HashMap::new();
        for t in &request.teachers {
            teachers.entry(t.id.as_str()).or_insert(t);
        }

        let mut subject_rules = HashMap::new();
        let mut unavailable = HashSet::new();
        for constraint in &request.time_constraints {
            match constraint {
                TimeConstraint::SubjectRule(rule) => {
                    subject_rules
                        .entry((rule.subject_id.as_str(), rule.class_group_id.as_str()))
                        .or_insert(rule);
                }
                TimeConstraint::TeacherUnavailability {
                    teacher_id,
                    day,
                    period_id,
                } => {
                    unavailable.insert((teacher_id.as_str(), day.as_str(), period_id.as_str()));
                }
                TimeConstraint::TeacherLoad { .. } => {}
            }
        }

        Self {
            grids,
            class_groups,
            subjects,
            teachers,
            subject_rules,
            unavailable,
        }
    }

    pub fn grid(&self, id: &str) -> Option<&'a TimeGrid> {
        self.grids.get(id).copied()
    }

    pub fn class_group(&self, id: &str) -> Option<&'a ClassGroup> {
        self.class_groups.get(id).copied()
    }

    pub fn subject(&self, id: &str) -> Option<&'a Subject> {
        self.subjects.get(id).copied()
    }

    pub fn teacher(&self, id: &str) -> Option<&'a Teacher> {
        self.teachers.get(id).copied()
    }

    /// The grid a class group follows, if it exists.
    pub fn grid_of(&self, class_group: &ClassGroup) -> Option<&'a TimeGrid> {
        class_group.time_grid_id.as_deref().and_then(|id| self.grid(id))
    }

    /// Class group and grid, if the group takes part in timetabling and its
    /// grid can hold lessons.
    pub fn schedulable(&self, class_group_id: &str) -> Option<(&'a ClassGroup, &'a TimeGrid)> {
        let cg = self.class_group(class_group_id)?;
        if !cg.timetabling_enabled {
            return None;
        }
        let grid = self.grid_of(cg)?;
        grid.is_usable().then_some((cg, grid))
    }

    /// The rule for a (subject, class group), if any.
    pub fn subject_rule(&self, subject_id: &str, class_group_id: &str) -> Option<&'a SubjectRule> {
        self.subject_rules.get(&(subject_id, class_group_id)).copied()
    }

    /// Whether a teacher declared (day, period) unavailable.
    pub fn is_unavailable(&self, teacher_id: &str, day: &str, period_id: &str) -> bool {
        self.unavailable.contains(&(teacher_id, day, period_id))
    }

    /// Human-readable lesson description for progress and conflicts.
    pub fn describe(&self, lesson: &Lesson) -> String {
        let subject = self
            .subject(&lesson.subject_id)
            .map_or(lesson.subject_id.as_str(), Subject::label);
        let class_group = self
            .class_group(&lesson.class_group_id)
            .map_or(lesson.class_group_id.as_str(), ClassGroup::label);
        let teacher = self
            .teacher(&lesson.teacher_id)
            .map_or(lesson.teacher_id.as_str(), Teacher::label);
        format!("{subject} ×{} for {class_group} with {teacher}", lesson.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicStructure, Period, SubjectRule};

    fn request() -> TimetableRequest {
        TimetableRequest::new()
            .with_time_grid(
                TimeGrid::new("g1")
                    .with_day("Mon")
                    .with_period(Period::lesson("p1", "08:00", "08:45")),
            )
            .with_time_grid(TimeGrid::new("bare"))
            .with_class_group(ClassGroup::new("7A", "g1").with_name("Year 7 A"))
            .with_class_group(ClassGroup::new("7B", "g1").disabled())
            .with_class_group(ClassGroup::new("7C", "bare"))
            .with_academic_structure(AcademicStructure::with_subjects(vec![
                Subject::core("MATH").with_name("Mathematics"),
            ]))
            .with_teacher(Teacher::new("T1").with_name("Ms Ortiz"))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(2, 1))
            .with_constraint(SubjectRule::new("MATH", "7A").with_lessons(9, 1))
            .with_constraint(TimeConstraint::teacher_unavailable("T1", "Mon", "p1"))
    }

    #[test]
    fn test_schedulable_filters() {
        let req = request();
        let catalog = Catalog::new(&req);
        assert!(catalog.schedulable("7A").is_some());
        assert!(catalog.schedulable("7B").is_none()); // disabled
        assert!(catalog.schedulable("7C").is_none()); // unusable grid
        assert!(catalog.schedulable("9Z").is_none());
    }

    #[test]
    fn test_first_rule_wins() {
        let req = request();
        let catalog = Catalog::new(&req);
        let rule = catalog.subject_rule("MATH", "7A").unwrap();
        assert_eq!(rule.lessons[0].count, 2);
        assert!(catalog.subject_rule("MATH", "7B").is_none());
    }

    #[test]
    fn test_unavailability() {
        let req = request();
        let catalog = Catalog::new(&req);
        assert!(catalog.is_unavailable("T1", "Mon", "p1"));
        assert!(!catalog.is_unavailable("T1", "Tue", "p1"));
    }

    #[test]
    fn test_describe() {
        let req = request();
        let catalog = Catalog::new(&req);
        let lesson = Lesson::new("x", "7A", "MATH", "T1", 2);
        assert_eq!(catalog.describe(&lesson), "Mathematics ×2 for Year 7 A with Ms Ortiz");

        let unknown = Lesson::new("y", "9Z", "LATIN", "T9", 1);
        assert_eq!(catalog.describe(&unknown), "LATIN ×1 for 9Z with T9");
    }
}
