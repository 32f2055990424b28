//! Inclusive calendar date ranges for report windows.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest range a report may cover, in days.
pub const MAX_RANGE_DAYS: i64 = 366;

/// An inclusive `[from, to]` range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day of the range.
    pub from_date: NaiveDate,
    /// Last day of the range (inclusive).
    pub to_date: NaiveDate,
}

impl DateRange {
    /// Build a validated range for a new report.
    pub fn new(from_date: NaiveDate, to_date: NaiveDate) -> Result<Self, AppError> {
        if to_date < from_date {
            return Err(AppError::validation(format!(
                "Invalid date range: toDate {to_date} is before fromDate {from_date}"
            )));
        }
        let range = Self { from_date, to_date };
        if range.day_count() > MAX_RANGE_DAYS {
            return Err(AppError::validation(format!(
                "Invalid date range: at most {MAX_RANGE_DAYS} days may be covered"
            )));
        }
        Ok(range)
    }

    /// Build a range without validation, as stored on an existing report.
    pub fn unchecked(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self { from_date, to_date }
    }

    /// Number of calendar days covered, `(to - from).days + 1`.
    ///
    /// Zero or negative for an inverted range.
    pub fn day_count(&self) -> i64 {
        (self.to_date - self.from_date).num_days() + 1
    }

    /// Start of the window: `from_date` at midnight UTC.
    pub fn window_start(&self) -> DateTime<Utc> {
        self.from_date.and_time(NaiveTime::MIN).and_utc()
    }

    /// End of the window: midnight UTC after `to_date`, so the whole last
    /// day is included.
    pub fn window_end(&self) -> DateTime<Utc> {
        self.to_date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.to_date)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// Whether `instant` falls inside `[window_start, window_end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.window_start() && instant < self.window_end()
    }
}
