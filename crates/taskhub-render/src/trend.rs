//! Day-by-day completed task trend.

use chrono::{Days, NaiveDate};

use taskhub_core::types::DateRange;
use taskhub_entity::task::Task;

/// Upper bound on trend entries.
pub const MAX_TREND_DAYS: usize = 365;

/// Completed tasks on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    /// The day.
    pub date: NaiveDate,
    /// DONE tasks finished that day.
    pub count: u32,
}

/// One entry per day of `range`, oldest first, capped at
/// [`MAX_TREND_DAYS`]. An inverted range yields no entries.
pub fn daily_completions(range: &DateRange, tasks: &[Task]) -> Vec<TrendPoint> {
    let days = range.day_count().clamp(0, MAX_TREND_DAYS as i64) as usize;
    let mut points: Vec<TrendPoint> = (0..days)
        .filter_map(|offset| range.from_date.checked_add_days(Days::new(offset as u64)))
        .map(|date| TrendPoint { date, count: 0 })
        .collect();

    for finished in tasks.iter().filter_map(Task::finished_at) {
        let day = finished.date_naive();
        if day < range.from_date {
            continue;
        }
        let index = (day - range.from_date).num_days() as usize;
        if let Some(point) = points.get_mut(index) {
            point.count += 1;
        }
    }
    points
}
