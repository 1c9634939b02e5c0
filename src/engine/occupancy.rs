//! Slot occupancy index.
//!
//! One mutable structure for the whole search, keyed by
//! (class group, day, period). Placements are applied with [`OccupancyIndex::place`]
//! and reverted with [`OccupancyIndex::unplace`] in LIFO order, which gives
//! every search branch the same view it would have on a private copy.
//!
//! Alongside the cells it keeps two counters so the hot checks are O(1):
//! teacher bookings per (teacher, day, period) and periods per
//! (class group, subject, day).

use std::collections::HashMap;

use crate::models::{GeneratedSlot, GeneratedTimetable, SubjectCategory, TimeGrid};

/// What occupies a cell, borrowed from the request and the lesson queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant<'a> {
    /// Lesson id or locked-lesson slot id.
    pub id: &'a str,
    pub class_group_id: &'a str,
    pub subject_id: &'a str,
    pub teacher_id: &'a str,
    pub category: SubjectCategory,
    pub elective_group: Option<&'a str>,
}

impl Occupant<'_> {
    /// Whether `self`, already in a cell, keeps `candidate` out of it.
    ///
    /// Core blocks and is blocked by anything. Electives only block
    /// electives of a different elective group.
    pub fn blocks(&self, candidate: &Occupant<'_>) -> bool {
        match (self.category, candidate.category) {
            (SubjectCategory::Core, _) | (_, SubjectCategory::Core) => true,
            (SubjectCategory::Elective, SubjectCategory::Elective) => {
                self.elective_group != candidate.elective_group
            }
        }
    }
}

/// An occupant written into `duration` consecutive periods of one day.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub occupant: Occupant<'a>,
    pub grid: &'a TimeGrid,
    pub day: &'a str,
    /// Index of the first period in `grid.periods`.
    pub start: usize,
    pub duration: usize,
}

impl<'a> Placement<'a> {
    /// Period ids covered, in order.
    ///
    /// The caller guarantees the range lies inside the grid.
    pub fn period_ids(&self) -> impl Iterator<Item = &'a str> + 'a {
        let grid = self.grid;
        grid.periods[self.start..self.start + self.duration]
            .iter()
            .map(|p| p.id.as_str())
    }
}

type CellKey<'a> = (&'a str, &'a str, &'a str);

/// Occupancy of every (class group, day, period) built so far.
#[derive(Debug, Default)]
pub struct OccupancyIndex<'a> {
    cells: HashMap<CellKey<'a>, Vec<Occupant<'a>>>,
    /// (teacher, day, period) → bookings.
    teacher_bookings: HashMap<CellKey<'a>, u32>,
    /// (class group, subject, day) → periods.
    subject_day_periods: HashMap<CellKey<'a>, u32>,
    placements: usize,
}

impl<'a> OccupancyIndex<'a> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any class group has this teacher at (day, period).
    #[inline]
    pub fn teacher_busy(&self, teacher_id: &str, day: &str, period_id: &str) -> bool {
        self.teacher_bookings
            .get(&(teacher_id, day, period_id))
            .is_some_and(|&n| n > 0)
    }

    /// Whether an existing occupant of the cell keeps `candidate` out.
    pub fn class_group_blocked(
        &self,
        class_group_id: &'a str,
        day: &'a str,
        period_id: &'a str,
        candidate: &Occupant<'_>,
    ) -> bool {
        self.occupants(class_group_id, day, period_id)
            .iter()
            .any(|existing| existing.blocks(candidate))
    }

    /// Periods of a subject already scheduled for a class group on a day.
    #[inline]
    pub fn subject_periods_on_day(&self, class_group_id: &str, subject_id: &str, day: &str) -> u32 {
        self.subject_day_periods
            .get(&(class_group_id, subject_id, day))
            .copied()
            .unwrap_or(0)
    }

    /// Occupants of one cell.
    pub fn occupants(&self, class_group_id: &'a str, day: &'a str, period_id: &'a str) -> &[Occupant<'a>] {
        self.cells
            .get(&(class_group_id, day, period_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of placements currently applied.
    pub fn placement_count(&self) -> usize {
        self.placements
    }

    /// Writes a placement into every period it covers.
    pub fn place(&mut self, placement: &Placement<'a>) {
        let occ = placement.occupant;
        for period_id in placement.period_ids() {
            self.cells
                .entry((occ.class_group_id, placement.day, period_id))
                .or_default()
                .push(occ);
            *self
                .teacher_bookings
                .entry((occ.teacher_id, placement.day, period_id))
                .or_insert(0) += 1;
        }
        *self
            .subject_day_periods
            .entry((occ.class_group_id, occ.subject_id, placement.day))
            .or_insert(0) += placement.duration as u32;
        self.placements += 1;
    }

    /// Reverts a placement.
    ///
    /// Must be the most recent placement still applied.
    pub fn unplace(&mut self, placement: &Placement<'a>) {
        let occ = placement.occupant;
        for period_id in placement.period_ids() {
            let key = (occ.class_group_id, placement.day, period_id);
            if let Some(cell) = self.cells.get_mut(&key) {
                let popped = cell.pop();
                debug_assert_eq!(popped.map(|o| o.id), Some(occ.id), "unplace out of order");
                if cell.is_empty() {
                    self.cells.remove(&key);
                }
            }
            decrement(&mut self.teacher_bookings, (occ.teacher_id, placement.day, period_id), 1);
        }
        decrement(
            &mut self.subject_day_periods,
            (occ.class_group_id, occ.subject_id, placement.day),
            placement.duration as u32,
        );
        self.placements -= 1;
    }

    /// Copies every occupied cell into a generated timetable.
    pub fn write_into(&self, timetable: &mut GeneratedTimetable) {
        for (&(cg, day, period), occupants) in &self.cells {
            for occ in occupants {
                timetable.push(
                    cg,
                    day,
                    period,
                    GeneratedSlot {
                        id: occ.id.to_string(),
                        class_group_id: occ.class_group_id.to_string(),
                        subject_id: occ.subject_id.to_string(),
                        teacher_id: occ.teacher_id.to_string(),
                    },
                );
            }
        }
    }
}

fn decrement<'a>(map: &mut HashMap<CellKey<'a>, u32>, key: CellKey<'a>, by: u32) {
    if let Some(n) = map.get_mut(&key) {
        *n = n.saturating_sub(by);
        if *n == 0 {
            map.remove(&key);
        }
    }
}
