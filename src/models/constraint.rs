//! Timetabling constraints and locked lessons.
//!
//! # Enforcement
//!
//! The search enforces:
//! - `SubjectRule::lessons` (what to expand) and `max_periods_per_day`
//! - `TeacherUnavailability`
//!
//! `min_days_apart`, `max_consecutive`, `must_be_every_day`,
//! `preferred_time` and the whole of `TeacherLoad` are carried through the
//! model and checked by nobody. They are kept so inputs round-trip intact.

use serde::{Deserialize, Serialize};

/// "N lessons of D consecutive periods".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDefinition {
    /// Number of lessons.
    pub count: u32,
    /// Consecutive periods per lesson.
    pub duration: u32,
}

impl LessonDefinition {
    /// Creates a definition.
    pub fn new(count: u32, duration: u32) -> Self {
        Self { count, duration }
    }
}

/// Preferred part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Any,
}

/// How many lessons of what length a (subject, class group) needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRule {
    /// Subject the rule applies to.
    pub subject_id: String,
    /// Class group the rule applies to.
    pub class_group_id: String,
    /// Lessons to generate.
    pub lessons: Vec<LessonDefinition>,
    /// Cap on periods of this subject per day for the class group.
    #[serde(default)]
    pub max_periods_per_day: Option<u32>,
    #[serde(default)]
    pub min_days_apart: Option<u32>,
    #[serde(default)]
    pub max_consecutive: Option<u32>,
    #[serde(default)]
    pub must_be_every_day: bool,
    #[serde(default)]
    pub preferred_time: Option<PreferredTime>,
}

impl SubjectRule {
    /// Creates a rule with no lessons.
    pub fn new(subject_id: impl Into<String>, class_group_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            class_group_id: class_group_id.into(),
            lessons: Vec::new(),
            max_periods_per_day: None,
            min_days_apart: None,
            max_consecutive: None,
            must_be_every_day: false,
            preferred_time: None,
        }
    }

    /// Adds `count` lessons of `duration` periods.
    pub fn with_lessons(mut self, count: u32, duration: u32) -> Self {
        self.lessons.push(LessonDefinition::new(count, duration));
        self
    }

    /// Caps the periods per day.
    pub fn with_max_periods_per_day(mut self, max: u32) -> Self {
        self.max_periods_per_day = Some(max);
        self
    }
}

/// A timetabling constraint.
///
/// Tagged on the wire by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeConstraint {
    /// Lesson requirements for a (subject, class group).
    SubjectRule(SubjectRule),

    /// Teacher cannot teach at (day, period).
    TeacherUnavailability {
        teacher_id: String,
        day: String,
        period_id: String,
    },

    /// Teacher workload limits.
    TeacherLoad {
        teacher_id: String,
        #[serde(default)]
        max_periods_per_day: Option<u32>,
        #[serde(default)]
        max_consecutive: Option<u32>,
    },
}

impl TimeConstraint {
    /// Creates a teacher unavailability.
    pub fn teacher_unavailable(
        teacher_id: impl Into<String>,
        day: impl Into<String>,
        period_id: impl Into<String>,
    ) -> Self {
        Self::TeacherUnavailability {
            teacher_id: teacher_id.into(),
            day: day.into(),
            period_id: period_id.into(),
        }
    }
}

impl From<SubjectRule> for TimeConstraint {
    fn from(rule: SubjectRule) -> Self {
        Self::SubjectRule(rule)
    }
}

/// A placement fixed before search begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedLesson {
    pub class_group_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub day: String,
    /// First period covered.
    pub period_id: String,
    /// Consecutive periods covered.
    pub duration: u32,
}

impl LockedLesson {
    /// Creates a single-period lock.
    pub fn new(
        class_group_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
        day: impl Into<String>,
        period_id: impl Into<String>,
    ) -> Self {
        Self {
            class_group_id: class_group_id.into(),
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            day: day.into(),
            period_id: period_id.into(),
            duration: 1,
        }
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Slot id used for this lock in the generated timetable.
    pub fn slot_id(&self) -> String {
        format!(
            "locked:{}:{}:{}:{}",
            self.class_group_id, self.subject_id, self.day, self.period_id
        )
    }
}
