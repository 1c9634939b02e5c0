//! Timetabling domain models.
//!
//! Provides the input records handed to the engine and the timetable it
//! produces. Input records are owned upstream; the engine never mutates them.
//!
//! # Domain Mappings
//!
//! | u-timetable | Generic scheduling | Notes |
//! |-------------|--------------------|-------|
//! | Lesson | Activity | fixed duration in periods |
//! | Teacher | Resource (human) | disjunctive across class groups |
//! | ClassGroup | Resource (room-like) | shared only by same-group electives |
//! | TimeGrid | Calendar | discrete periods, breaks are blocked |
//! | GeneratedTimetable | Schedule | |
//! | Conflict | Violation | |

mod constraint;
mod grid;
mod lesson;
mod school;
mod timetable;

pub use constraint::{LessonDefinition, LockedLesson, PreferredTime, SubjectRule, TimeConstraint};
pub use grid::{Period, PeriodKind, TimeGrid};
pub use lesson::Lesson;
pub use school::{AcademicStructure, ClassGroup, Subject, SubjectCategory, Teacher, TeacherAllocation};
pub use timetable::{
    Conflict, ConflictDetails, ConflictKind, GeneratedSlot, GeneratedTimetable, TimetableResult,
};
