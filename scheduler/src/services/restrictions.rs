//! Recurring time-restriction expansion.
//!
//! A restriction is a set of relative ranges within a calendar period: hours
//! of the day, decimal day offsets within the ISO week, decimal month offsets
//! within the year. This module projects those relative ranges onto successive
//! calendar periods covering a base window, then intersects (`InRange`) or
//! complements (`OutRange`) the projection against the window.
//!
//! Restrictions compose by sequential application (hour, then weekday, then
//! month), each pass narrowing the candidate window set further.

use crate::api::{RestrictionCondition, TimeRange, TimeRestriction, TimeRestrictions};
use crate::models::range;
use crate::models::time;

/// Projection function shared by the three calendar kinds.
type MapRangeFn = fn(&[(f64, f64)], &TimeRange) -> Vec<TimeRange>;

#[derive(Debug, Clone, Copy)]
enum ProjectionStep {
    Day,
    Week,
    Year,
}

impl ProjectionStep {
    fn advance(self, window: TimeRange) -> TimeRange {
        match self {
            ProjectionStep::Day => TimeRange::new(
                window.start + time::MS_PER_DAY,
                window.end + time::MS_PER_DAY,
            ),
            ProjectionStep::Week => TimeRange::new(
                window.start + time::MS_PER_WEEK,
                window.end + time::MS_PER_WEEK,
            ),
            ProjectionStep::Year => TimeRange::new(
                time::add_calendar_years(window.start, 1),
                time::add_calendar_years(window.end, 1),
            ),
        }
    }
}

/// Repeat `first` period by period until its start passes `until`.
fn project(first: TimeRange, step: ProjectionStep, until: f64) -> Vec<TimeRange> {
    let mut out = Vec::new();
    let mut current = first;
    while current.start < until {
        out.push(current);
        current = step.advance(current);
    }
    out
}

/// Projection stop bound: the end of the day containing the mask end.
fn projection_end(mask: &TimeRange) -> f64 {
    time::start_of_day(mask.end) + time::MS_PER_DAY
}

/// Project hour-of-day ranges onto every day covering the mask.
pub fn map_to_hour_range(restricts: &[(f64, f64)], mask: &TimeRange) -> Vec<TimeRange> {
    let day = time::start_of_day(mask.start);
    let until = projection_end(mask);
    restricts
        .iter()
        .flat_map(|&(from, to)| {
            let first = TimeRange::new(time::add_hours(day, from), time::add_hours(day, to));
            project(first, ProjectionStep::Day, until)
        })
        .collect()
}

/// Project decimal weekday ranges (0 = Monday 00:00) onto every ISO week
/// covering the mask.
pub fn map_to_weekday_range(restricts: &[(f64, f64)], mask: &TimeRange) -> Vec<TimeRange> {
    let week = time::start_of_week(mask.start);
    let until = projection_end(mask);
    restricts
        .iter()
        .flat_map(|&(from, to)| {
            let first = TimeRange::new(
                time::add_decimal_days(week, from),
                time::add_decimal_days(week, to),
            );
            project(first, ProjectionStep::Week, until)
        })
        .collect()
}

/// Project decimal month ranges (0 = January 1st) onto every year covering
/// the mask. The fractional part scales with the length of the landing month.
pub fn map_to_month_range(restricts: &[(f64, f64)], mask: &TimeRange) -> Vec<TimeRange> {
    let year = time::start_of_year(mask.start);
    let until = projection_end(mask);
    restricts
        .iter()
        .flat_map(|&(from, to)| {
            let first = TimeRange::new(
                time::add_decimal_months(year, from),
                time::add_decimal_months(year, to),
            );
            project(first, ProjectionStep::Year, until)
        })
        .collect()
}

fn apply_to_mask(tr: &TimeRestriction, map_fn: MapRangeFn, mask: &TimeRange) -> Vec<TimeRange> {
    let projected = map_fn(&tr.ranges, mask);
    let windows = range::intersect(&projected, std::slice::from_ref(mask));
    match tr.condition {
        RestrictionCondition::InRange => windows,
        RestrictionCondition::OutRange => range::complement(mask, &windows),
    }
}

/// Apply one restriction across a mask list; absent restrictions pass the
/// masks through unchanged.
pub fn apply_restriction(
    masks: &[TimeRange],
    tr: Option<&TimeRestriction>,
    map_fn: MapRangeFn,
) -> Vec<TimeRange> {
    match tr {
        None => masks.to_vec(),
        Some(tr) => masks
            .iter()
            .flat_map(|mask| apply_to_mask(tr, map_fn, mask))
            .collect(),
    }
}

/// Expand a query's recurring restrictions over its base window into the
/// final list of allowed windows. A query with multiple restriction kinds
/// must satisfy all of them simultaneously.
pub fn restriction_masks(
    base: TimeRange,
    restrictions: Option<&TimeRestrictions>,
) -> Vec<TimeRange> {
    let mut masks = vec![base];
    if let Some(trs) = restrictions {
        masks = apply_restriction(&masks, trs.hour.as_ref(), map_to_hour_range);
        masks = apply_restriction(&masks, trs.weekday.as_ref(), map_to_weekday_range);
        masks = apply_restriction(&masks, trs.month.as_ref(), map_to_month_range);
    }
    masks
}
