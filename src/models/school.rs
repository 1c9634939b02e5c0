//! School entities: teachers, class groups, subjects and allocations.
//!
//! These records are owned by upstream collaborators and arrive already
//! filtered by tenant and academic year. The engine only reads them.

use serde::{Deserialize, Serialize};

/// A teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

impl Teacher {
    /// Creates a teacher.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name if set, otherwise id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A class group (form, homeroom, section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassGroup {
    /// Unique class group identifier.
    pub id: String,
    /// Display name, e.g. "7A".
    #[serde(default)]
    pub name: String,
    /// Curriculum identifier.
    #[serde(default)]
    pub curriculum: String,
    /// Grade / year level.
    #[serde(default)]
    pub grade: String,
    /// Attendance mode (day, boarding, evening, ...).
    #[serde(default)]
    pub mode: String,
    /// Whether this group takes part in timetable generation.
    pub timetabling_enabled: bool,
    /// The grid this group follows.
    pub time_grid_id: Option<String>,
}

impl ClassGroup {
    /// Creates a class group that participates in timetabling.
    pub fn new(id: impl Into<String>, time_grid_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            curriculum: String::new(),
            grade: String::new(),
            mode: String::new(),
            timetabling_enabled: true,
            time_grid_id: Some(time_grid_id.into()),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets curriculum and grade.
    pub fn with_curriculum(mut self, curriculum: impl Into<String>, grade: impl Into<String>) -> Self {
        self.curriculum = curriculum.into();
        self.grade = grade.into();
        self
    }

    /// Sets the attendance mode.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Excludes this group from timetabling.
    pub fn disabled(mut self) -> Self {
        self.timetabling_enabled = false;
        self
    }

    /// Name if set, otherwise id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Subject category.
///
/// A core subject owns its slot exclusively. Electives may share a slot
/// with other electives of the same elective group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectCategory {
    /// Taken by the whole class group.
    #[default]
    Core,
    /// Taken by a stream of the class group.
    Elective,
}

/// A subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Core or elective.
    pub category: SubjectCategory,
    /// Elective cluster whose members are co-schedulable.
    #[serde(default)]
    pub elective_group: Option<String>,
}

impl Subject {
    /// Creates a core subject.
    pub fn core(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: SubjectCategory::Core,
            elective_group: None,
        }
    }

    /// Creates an elective subject in the given group.
    pub fn elective(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            category: SubjectCategory::Elective,
            elective_group: Some(group.into()),
            ..Self::core(id)
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this is a core subject.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.category == SubjectCategory::Core
    }

    /// Name if set, otherwise id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Who teaches what to whom.
///
/// Carries no timing: the number and length of lessons come from the
/// matching [`SubjectRule`](super::SubjectRule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAllocation {
    /// Teaching teacher.
    pub teacher_id: String,
    /// Taught class group.
    pub class_group_id: String,
    /// Taught subject.
    pub subject_id: String,
}

impl TeacherAllocation {
    /// Creates an allocation.
    pub fn new(
        teacher_id: impl Into<String>,
        class_group_id: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            class_group_id: class_group_id.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// Curricula, grades and the subject catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicStructure {
    /// Known curricula.
    #[serde(default)]
    pub curricula: Vec<String>,
    /// Subject catalogue.
    pub subjects: Vec<Subject>,
}

impl AcademicStructure {
    /// Creates a structure from a subject catalogue.
    pub fn with_subjects(subjects: Vec<Subject>) -> Self {
        Self {
            curricula: Vec::new(),
            subjects,
        }
    }

    /// Finds a subject by id.
    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }
}
