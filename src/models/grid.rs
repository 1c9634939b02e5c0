//! Time grid model.
//!
//! A time grid is the weekly template a class group follows: an ordered
//! list of day names and an ordered list of periods shared by every day.
//!
//! # Period Model
//! Periods are referenced by id. Only `PeriodKind::Lesson` periods can hold
//! lessons; a multi-period lesson must occupy consecutive lesson periods on
//! one day and may never cross a `PeriodKind::Break` or run past the last
//! period of the grid.

use serde::{Deserialize, Serialize};

/// Whether a period can hold teaching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Teaching period.
    #[default]
    Lesson,
    /// Recess, lunch, assembly.
    Break,
}

/// One period of the daily grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Period identifier (unique within its grid).
    pub id: String,
    /// Wall-clock start, e.g. "08:00".
    pub start_time: String,
    /// Wall-clock end, e.g. "08:45".
    pub end_time: String,
    /// Lesson or break.
    pub kind: PeriodKind,
}

impl Period {
    /// Creates a lesson period.
    pub fn lesson(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            kind: PeriodKind::Lesson,
        }
    }

    /// Creates a break period.
    pub fn break_period(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            kind: PeriodKind::Break,
            ..Self::lesson(id, start_time, end_time)
        }
    }

    /// Whether lessons may be placed in this period.
    #[inline]
    pub fn is_lesson(&self) -> bool {
        self.kind == PeriodKind::Lesson
    }
}

/// Weekly day/period template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Grid identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Day names in display (and search) order.
    pub days: Vec<String>,
    /// Periods in chronological order.
    pub periods: Vec<Period>,
    /// Display color (opaque to the engine).
    #[serde(default)]
    pub color: String,
}

impl TimeGrid {
    /// Creates an empty grid.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            days: Vec::new(),
            periods: Vec::new(),
            color: String::new(),
        }
    }

    /// Sets the grid name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a day.
    pub fn with_day(mut self, day: impl Into<String>) -> Self {
        self.days.push(day.into());
        self
    }

    /// Adds several days.
    pub fn with_days<I, S>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.days.extend(days.into_iter().map(Into::into));
        self
    }

    /// Adds a period.
    pub fn with_period(mut self, period: Period) -> Self {
        self.periods.push(period);
        self
    }

    /// Sets the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Index of a period by id.
    pub fn period_index(&self, period_id: &str) -> Option<usize> {
        self.periods.iter().position(|p| p.id == period_id)
    }

    /// Whether the grid has a day with this name.
    pub fn has_day(&self, day: &str) -> bool {
        self.days.iter().any(|d| d == day)
    }

    /// Number of lesson periods per day.
    pub fn lesson_periods_per_day(&self) -> usize {
        self.periods.iter().filter(|p| p.is_lesson()).count()
    }

    /// Whether the grid can hold anything at all.
    pub fn is_usable(&self) -> bool {
        !self.days.is_empty() && self.lesson_periods_per_day() > 0
    }

    /// Whether a lesson of `duration` periods fits from `start`.
    ///
    /// Every covered period must exist and be a lesson period.
    pub fn fits(&self, start: usize, duration: usize) -> bool {
        if duration == 0 || start + duration > self.periods.len() {
            return false;
        }
        self.periods[start..start + duration]
            .iter()
            .all(Period::is_lesson)
    }

    /// Longest run of consecutive lesson periods in a day.
    pub fn longest_lesson_run(&self) -> usize {
        let mut best = 0;
        let mut run = 0;
        for p in &self.periods {
            if p.is_lesson() {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> TimeGrid {
        TimeGrid::new("g1")
            .with_days(["Mon", "Tue"])
            .with_period(Period::lesson("p1", "08:00", "08:45"))
            .with_period(Period::lesson("p2", "08:50", "09:35"))
            .with_period(Period::break_period("brk", "09:35", "09:55"))
            .with_period(Period::lesson("p3", "09:55", "10:40"))
    }

    #[test]
    fn test_fits_within_lesson_run() {
        let g = sample_grid();
        assert!(g.fits(0, 1));
        assert!(g.fits(0, 2));
        assert!(g.fits(3, 1));
    }

    #[test]
    fn test_fits_rejects_break_and_overflow() {
        let g = sample_grid();
        assert!(!g.fits(1, 2)); // p2 + break
        assert!(!g.fits(2, 1)); // break itself
        assert!(!g.fits(3, 2)); // past end of day
        assert!(!g.fits(0, 0));
    }

    #[test]
    fn test_period_lookup() {
        let g = sample_grid();
        assert_eq!(g.period_index("p3"), Some(3));
        assert_eq!(g.period_index("nope"), None);
        assert!(g.has_day("Tue"));
        assert!(!g.has_day("Sun"));
    }

    #[test]
    fn test_lesson_counts() {
        let g = sample_grid();
        assert_eq!(g.lesson_periods_per_day(), 3);
        assert_eq!(g.longest_lesson_run(), 2);
        assert!(g.is_usable());
        assert!(!TimeGrid::new("empty").is_usable());
    }

    #[test]
    fn test_period_kind_wire_format() {
        let json = serde_json::to_string(&PeriodKind::Break).unwrap();
        assert_eq!(json, "\"break\"");
    }
}
