//! Result assembly.

use super::search::{LessonPlan, SearchOutcome};
use super::{Catalog, TimetableRequest};
use crate::models::{Conflict, GeneratedTimetable, TimetableResult};
use crate::validation::ValidationError;

/// Builds the terminal result of a run.
///
/// The timetable holds a (possibly empty) cell for every day and period of
/// every schedulable class group, then every locked and placed lesson. One
/// placement-failure conflict is emitted per unplaced lesson.
pub fn build_result(
    catalog: &Catalog<'_>,
    request: &TimetableRequest,
    plans: &[LessonPlan<'_>],
    outcome: &SearchOutcome<'_>,
    skipped: Vec<ValidationError>,
) -> TimetableResult {
    let mut timetable = GeneratedTimetable::new();
    for cg in &request.class_groups {
        let Some((cg, grid)) = catalog.schedulable(&cg.id) else {
            continue;
        };
        for day in &grid.days {
            for period in &grid.periods {
                timetable.ensure_cell(&cg.id, day, &period.id);
            }
        }
    }
    outcome.index.write_into(&mut timetable);

    let mut conflicts = Vec::new();
    if let Some(failed_at) = outcome.failed_at {
        if let Some(stuck) = plans.get(failed_at) {
            let stuck_text = catalog.describe(stuck.lesson);
            conflicts.push(Conflict::placement_failure(
                stuck.lesson,
                format!("Could not place {stuck_text}: no legal slot remained"),
            ));
            for plan in &plans[failed_at + 1..] {
                conflicts.push(Conflict::placement_failure(
                    plan.lesson,
                    format!(
                        "Not attempted: search stopped at {stuck_text} before reaching {}",
                        catalog.describe(plan.lesson)
                    ),
                ));
            }
        }
    }

    TimetableResult {
        timetable,
        conflicts,
        skipped,
        academic_year: request.current_academic_year.clone(),
        lessons_total: plans.len(),
        lessons_placed: outcome.placements.len(),
        backtracks: outcome.backtracks,
    }
}
