//! Generated timetable (solution) model.
//!
//! A timetable maps class group → day → period → occupants. All levels are
//! ordered maps, so two identical runs serialize to identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Lesson;
use crate::validation::ValidationError;

/// One lesson's footprint in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSlot {
    /// Lesson id (or locked-lesson slot id).
    pub id: String,
    pub class_group_id: String,
    pub subject_id: String,
    pub teacher_id: String,
}

type DayCells = BTreeMap<String, Vec<GeneratedSlot>>;
type ClassWeek = BTreeMap<String, DayCells>;

/// class group → day → period id → slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedTimetable {
    cells: BTreeMap<String, ClassWeek>,
}

impl GeneratedTimetable {
    /// Creates an empty timetable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure a (class group, day, period) cell exists, possibly empty.
    pub fn ensure_cell(&mut self, class_group_id: &str, day: &str, period_id: &str) {
        self.cell_mut(class_group_id, day, period_id);
    }

    /// Appends a slot to a cell.
    pub fn push(&mut self, class_group_id: &str, day: &str, period_id: &str, slot: GeneratedSlot) {
        self.cell_mut(class_group_id, day, period_id).push(slot);
    }

    fn cell_mut(&mut self, class_group_id: &str, day: &str, period_id: &str) -> &mut Vec<GeneratedSlot> {
        self.cells
            .entry(class_group_id.to_string())
            .or_default()
            .entry(day.to_string())
            .or_default()
            .entry(period_id.to_string())
            .or_default()
    }

    /// Slots in a cell (empty if absent).
    pub fn slots(&self, class_group_id: &str, day: &str, period_id: &str) -> &[GeneratedSlot] {
        self.cells
            .get(class_group_id)
            .and_then(|week| week.get(day))
            .and_then(|cells| cells.get(period_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Class groups present in the timetable.
    pub fn class_group_ids(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Iterates over every cell as (class group, day, period id, slots).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &[GeneratedSlot])> {
        self.cells.iter().flat_map(|(cg, week)| {
            week.iter().flat_map(move |(day, cells)| {
                cells
                    .iter()
                    .map(move |(period, slots)| (cg.as_str(), day.as_str(), period.as_str(), slots.as_slice()))
            })
        })
    }

    /// Total number of slots (a lesson of duration 2 counts twice).
    pub fn slot_count(&self) -> usize {
        self.iter().map(|(_, _, _, slots)| slots.len()).sum()
    }

    /// Cells occupied by a lesson, as (class group, day, period id).
    pub fn footprint(&self, lesson_id: &str) -> Vec<(&str, &str, &str)> {
        self.iter()
            .filter(|(_, _, _, slots)| slots.iter().any(|s| s.id == lesson_id))
            .map(|(cg, day, period, _)| (cg, day, period))
            .collect()
    }

    /// Whether the timetable has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }
}

/// Conflict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The search could not place a lesson.
    #[serde(rename = "Placement Failure")]
    PlacementFailure,
    /// A teacher appears in two class groups in the same period.
    #[serde(rename = "Teacher Double-Booked")]
    TeacherDoubleBooked,
    /// A placement breaks a timetabling rule.
    #[serde(rename = "Constraint Violation")]
    ConstraintViolation,
    /// Two locked lessons claim the same teacher or cell.
    #[serde(rename = "Locked Lesson Overlap")]
    LockedLessonOverlap,
}

impl ConflictKind {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlacementFailure => "Placement Failure",
            Self::TeacherDoubleBooked => "Teacher Double-Booked",
            Self::ConstraintViolation => "Constraint Violation",
            Self::LockedLessonOverlap => "Locked Lesson Overlap",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            Self::PlacementFailure => "placement",
            Self::TeacherDoubleBooked => "double-booked",
            Self::ConstraintViolation => "violation",
            Self::LockedLessonOverlap => "locked-overlap",
        }
    }
}

/// Entities a conflict is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDetails {
    pub class_group_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_id: Option<String>,
}

/// A structured problem with the timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub message: String,
    pub details: ConflictDetails,
}

impl Conflict {
    /// Creates a conflict; the id is derived from kind and `key`.
    pub fn new(kind: ConflictKind, key: &str, message: impl Into<String>, details: ConflictDetails) -> Self {
        Self {
            id: format!("{}:{key}", kind.id_prefix()),
            kind,
            message: message.into(),
            details,
        }
    }

    /// Creates a placement failure for a lesson.
    pub fn placement_failure(lesson: &Lesson, message: impl Into<String>) -> Self {
        Self::new(
            ConflictKind::PlacementFailure,
            &lesson.id,
            message,
            ConflictDetails {
                class_group_id: lesson.class_group_id.clone(),
                subject_id: lesson.subject_id.clone(),
                teacher_id: lesson.teacher_id.clone(),
                lesson_id: Some(lesson.id.clone()),
                ..ConflictDetails::default()
            },
        )
    }
}

/// Terminal output of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableResult {
    pub timetable: GeneratedTimetable,
    pub conflicts: Vec<Conflict>,
    /// Input records skipped because they were malformed.
    #[serde(default)]
    pub skipped: Vec<ValidationError>,
    #[serde(default)]
    pub academic_year: String,
    /// Lessons handed to the search (locked lessons excluded).
    pub lessons_total: usize,
    pub lessons_placed: usize,
    /// Exhausted-candidate events during the search.
    pub backtracks: u64,
}

impl TimetableResult {
    /// Whether every lesson found a place.
    pub fn is_complete(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Conflicts of one kind.
    pub fn conflicts_of(&self, kind: ConflictKind) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: &str, teacher: &str) -> GeneratedSlot {
        GeneratedSlot {
            id: id.into(),
            class_group_id: "7A".into(),
            subject_id: "MATH".into(),
            teacher_id: teacher.into(),
        }
    }

    #[test]
    fn test_push_and_lookup() {
        let mut tt = GeneratedTimetable::new();
        tt.ensure_cell("7A", "Mon", "p2");
        tt.push("7A", "Mon", "p1", slot("L1", "T1"));

        assert_eq!(tt.slots("7A", "Mon", "p1").len(), 1);
        assert!(tt.slots("7A", "Mon", "p2").is_empty());
        assert!(tt.slots("7B", "Mon", "p1").is_empty());
        assert_eq!(tt.slot_count(), 1);
        assert_eq!(tt.class_group_ids().collect::<Vec<_>>(), vec!["7A"]);
    }

    #[test]
    fn test_footprint() {
        let mut tt = GeneratedTimetable::new();
        tt.push("7A", "Mon", "p1", slot("L1", "T1"));
        tt.push("7A", "Mon", "p2", slot("L1", "T1"));
        tt.push("7A", "Tue", "p1", slot("L2", "T1"));

        assert_eq!(tt.footprint("L1"), vec![("7A", "Mon", "p1"), ("7A", "Mon", "p2")]);
        assert_eq!(tt.footprint("missing"), Vec::<(&str, &str, &str)>::new());
    }

    #[test]
    fn test_serialization_is_ordered() {
        let mut a = GeneratedTimetable::new();
        a.push("7B", "Tue", "p1", slot("L2", "T2"));
        a.push("7A", "Mon", "p1", slot("L1", "T1"));

        let mut b = GeneratedTimetable::new();
        b.push("7A", "Mon", "p1", slot("L1", "T1"));
        b.push("7B", "Tue", "p1", slot("L2", "T2"));

        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_placement_failure_conflict() {
        let lesson = Lesson::new("7A:MATH:1:0", "7A", "MATH", "T1", 1);
        let c = Conflict::placement_failure(&lesson, "no slot");
        assert_eq!(c.kind, ConflictKind::PlacementFailure);
        assert_eq!(c.id, "placement:7A:MATH:1:0");
        assert_eq!(c.details.teacher_id, "T1");

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "Placement Failure");
    }
}
