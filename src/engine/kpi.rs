//! Timetable quality metrics (KPIs).
//!
//! Computes summary indicators from a finished run and the request it was
//! generated from.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Scheduled periods | Occupied (class group, day, period) cells |
//! | Unplaced lessons | Placement failures |
//! | Placement rate | Placed lessons / lessons handed to the search |
//! | Fill rate | Occupied lesson cells / available lesson cells, per class group |
//! | Teacher load | Distinct periods taught, per teacher |
//! | Peak daily load | Most periods a teacher teaches on one day |

use std::collections::{HashMap, HashSet};

use super::{Catalog, TimetableRequest};
use crate::models::{ConflictKind, TimetableResult};

/// Timetable performance indicators.
#[derive(Debug, Clone)]
pub struct TimetableKpi {
    /// Occupied cells across all class groups.
    pub scheduled_periods: usize,
    /// Lessons reported as placement failures.
    pub unplaced_lessons: usize,
    /// Fraction of queued lessons that were placed (0.0..1.0).
    pub placement_rate: f64,
    /// Mean fill rate over class groups (0.0..1.0).
    pub avg_fill_rate: f64,
    /// Per-class-group fill rate over lesson periods.
    pub fill_rate_by_class_group: HashMap<String, f64>,
    /// Distinct (day, period) pairs each teacher teaches.
    pub periods_by_teacher: HashMap<String, usize>,
    /// Most periods each teacher teaches on a single day.
    pub peak_daily_load_by_teacher: HashMap<String, usize>,
}

impl TimetableKpi {
    /// Computes KPIs from a run result and its request.
    pub fn calculate(request: &TimetableRequest, result: &TimetableResult) -> Self {
        let catalog = Catalog::new(request);

        let mut scheduled_periods = 0;
        let mut occupied_by_class_group: HashMap<&str, usize> = HashMap::new();
        let mut teacher_cells: HashSet<(&str, &str, &str)> = HashSet::new();

        for (cg, day, period, slots) in result.timetable.iter() {
            if slots.is_empty() {
                continue;
            }
            scheduled_periods += 1;
            *occupied_by_class_group.entry(cg).or_insert(0) += 1;
            for slot in slots {
                teacher_cells.insert((slot.teacher_id.as_str(), day, period));
            }
        }

        let mut fill_rate_by_class_group = HashMap::new();
        for cg in result.timetable.class_group_ids() {
            let Some((_, grid)) = catalog.schedulable(cg) else {
                continue;
            };
            let capacity = grid.days.len() * grid.lesson_periods_per_day();
            let occupied = occupied_by_class_group.get(cg).copied().unwrap_or(0);
            let rate = if capacity == 0 {
                0.0
            } else {
                occupied as f64 / capacity as f64
            };
            fill_rate_by_class_group.insert(cg.to_string(), rate);
        }
        let avg_fill_rate = if fill_rate_by_class_group.is_empty() {
            0.0
        } else {
            fill_rate_by_class_group.values().sum::<f64>() / fill_rate_by_class_group.len() as f64
        };

        let mut periods_by_teacher: HashMap<String, usize> = HashMap::new();
        let mut daily: HashMap<(&str, &str), usize> = HashMap::new();
        for &(teacher, day, _) in &teacher_cells {
            *periods_by_teacher.entry(teacher.to_string()).or_insert(0) += 1;
            *daily.entry((teacher, day)).or_insert(0) += 1;
        }
        let mut peak_daily_load_by_teacher: HashMap<String, usize> = HashMap::new();
        for ((teacher, _), n) in daily {
            let peak = peak_daily_load_by_teacher.entry(teacher.to_string()).or_insert(0);
            *peak = (*peak).max(n);
        }

        let unplaced_lessons = result.conflicts_of(ConflictKind::PlacementFailure).count();
        let placement_rate = if result.lessons_total == 0 {
            1.0
        } else {
            result.lessons_placed as f64 / result.lessons_total as f64
        };

        Self {
            scheduled_periods,
            unplaced_lessons,
            placement_rate,
            avg_fill_rate,
            fill_rate_by_class_group,
            periods_by_teacher,
            peak_daily_load_by_teacher,
        }
    }

    /// Highest single-day load of any teacher.
    pub fn max_daily_load(&self) -> usize {
        self.peak_daily_load_by_teacher.values().copied().max().unwrap_or(0)
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_placement_rate: f64, max_daily_load: usize) -> bool {
        self.placement_rate >= min_placement_rate && self.max_daily_load() <= max_daily_load
    }
}
