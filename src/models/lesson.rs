//! Lesson model.
//!
//! A lesson is one schedulable instance derived from an allocation and its
//! subject rule. Lessons are rebuilt at the start of every run and never
//! persisted.

use serde::{Deserialize, Serialize};

/// One schedulable instance of an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Stable id: unique per (class group, subject, duration, occurrence).
    pub id: String,
    pub class_group_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    /// Consecutive periods occupied.
    pub duration: usize,
}

impl Lesson {
    /// Builds the stable lesson id for the `occurrence`-th lesson of a
    /// (class group, subject, duration).
    pub fn make_id(class_group_id: &str, subject_id: &str, duration: usize, occurrence: usize) -> String {
        format!("{class_group_id}:{subject_id}:{duration}:{occurrence}")
    }

    /// Creates a lesson with an explicit id.
    pub fn new(
        id: impl Into<String>,
        class_group_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
        duration: usize,
    ) -> Self {
        Self {
            id: id.into(),
            class_group_id: class_group_id.into(),
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            duration,
        }
    }
}
