//! Placement legality.
//!
//! A candidate (lesson, day, start period) is legal iff for every covered
//! period:
//! - the period exists and is a lesson period,
//! - the teacher is neither booked elsewhere nor declared unavailable,
//! - no occupant of the class group's cell blocks the lesson;
//!
//! and, when the subject rule caps periods per day, the periods already on
//! that day plus this lesson's duration stay within the cap.
//!
//! No partial credit: the first failed check rejects the candidate.

use super::occupancy::{OccupancyIndex, Placement};
use super::Catalog;

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection<'a> {
    /// Runs past the last period of the day.
    OutsideGrid,
    /// Covers a break.
    BreakPeriod { period_id: &'a str },
    /// Teacher already teaches another lesson then.
    TeacherBusy { period_id: &'a str },
    /// Teacher declared the period unavailable.
    TeacherUnavailable { period_id: &'a str },
    /// An occupant of the cell excludes this subject.
    ClassGroupBlocked { period_id: &'a str },
    /// The subject's per-day cap would be exceeded.
    DailyCapReached { cap: u32 },
}

/// Checks candidates against the occupancy index and request constraints.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintEvaluator<'c, 'a> {
    catalog: &'c Catalog<'a>,
}

impl<'c, 'a> ConstraintEvaluator<'c, 'a> {
    pub fn new(catalog: &'c Catalog<'a>) -> Self {
        Self { catalog }
    }

    /// Returns `None` if the placement is legal, otherwise the first reason
    /// it is not.
    pub fn check(&self, index: &OccupancyIndex<'a>, candidate: &Placement<'a>) -> Option<Rejection<'a>> {
        let grid = candidate.grid;
        let occ = &candidate.occupant;
        if candidate.duration == 0 || candidate.start + candidate.duration > grid.periods.len() {
            return Some(Rejection::OutsideGrid);
        }

        for period in &grid.periods[candidate.start..candidate.start + candidate.duration] {
            let period_id = period.id.as_str();
            if !period.is_lesson() {
                return Some(Rejection::BreakPeriod { period_id });
            }
            if index.teacher_busy(occ.teacher_id, candidate.day, period_id) {
                return Some(Rejection::TeacherBusy { period_id });
            }
            if self.catalog.is_unavailable(occ.teacher_id, candidate.day, period_id) {
                return Some(Rejection::TeacherUnavailable { period_id });
            }
            if index.class_group_blocked(occ.class_group_id, candidate.day, period_id, occ) {
                return Some(Rejection::ClassGroupBlocked { period_id });
            }
        }

        let cap = self
            .catalog
            .subject_rule(occ.subject_id, occ.class_group_id)
            .and_then(|rule| rule.max_periods_per_day);
        if let Some(cap) = cap {
            let already = index.subject_periods_on_day(occ.class_group_id, occ.subject_id, candidate.day);
            if already + candidate.duration as u32 > cap {
                return Some(Rejection::DailyCapReached { cap });
            }
        }

        None
    }

    /// Whether the placement is legal.
    #[inline]
    pub fn is_legal(&self, index: &OccupancyIndex<'a>, candidate: &Placement<'a>) -> bool {
        self.check(index, candidate).is_none()
    }
}
