//! Work-calendar capability.
//!
//! The engine never decides which days are workdays — holiday and weekend
//! logic lives with the caller. All date arithmetic goes through the
//! [`WorkCalendar`] trait, passed by reference into the capacity tracker
//! and the planning engine.

use chrono::{Datelike, NaiveDate, Weekday};

/// Answers "is this a workday?" and "what is the next workday?".
///
/// Implementations must guarantee that [`WorkCalendar::next_workday`]
/// returns a date strictly after its argument and that the returned date
/// satisfies [`WorkCalendar::is_workday`] (except at the end of the
/// representable date range, where advancing saturates).
pub trait WorkCalendar {
    /// Return `true` if `date` is a workday.
    fn is_workday(&self, date: NaiveDate) -> bool;

    /// Return the first workday strictly after `date`.
    fn next_workday(&self, date: NaiveDate) -> NaiveDate;

    /// Snap `date` forward: `date` itself if it is a workday, otherwise the
    /// next workday.
    fn first_workday_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        if self.is_workday(date) {
            date
        } else {
            self.next_workday(date)
        }
    }
}

/// Monday–Friday calendar with no holidays.
///
/// The obvious default for tests and for callers without a holiday feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekdayCalendar;

impl WorkCalendar for WeekdayCalendar {
    fn is_workday(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        loop {
            // Saturate at the end of the representable range rather than panic.
            let Some(next) = day.succ_opt() else {
                return day;
            };
            day = next;
            if self.is_workday(day) {
                return day;
            }
        }
    }
}
