//! Per-assignee capacity ledger with partial-day splitting.
//!
//! # Overview
//!
//! One [`AssigneeCapacityTracker`] is built per active team member per
//! planning run. It records hours already committed per calendar date and
//! answers availability queries. The ledger invariant: committed hours on
//! any date never exceed the member's effective hours-per-day, and absence
//! dates always report zero availability.
//!
//! Partial days are first-class — 3h on one story plus 5h on another is a
//! valid single day for an 8h member. That is what makes the greedy
//! [`AssigneeCapacityTracker::allocate`] loop a day-*splitting* allocator
//! rather than a day-counting one.
//!
//! # Scan Cap
//!
//! Calendar walks are bounded by [`MAX_SCAN_DAYS`]. Hitting the cap is an
//! explicit degradation (return what was found so far), never an infinite
//! loop.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::trace;

use crate::calendar::WorkCalendar;
use crate::error::CapacityError;
use crate::model::{Role, TeamMember};
use crate::round2;

/// Hard bound on calendar-walk iterations (one year of days).
pub const MAX_SCAN_DAYS: usize = 365;

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Outcome of a multi-day hour allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// First date with hours reserved.
    pub start: NaiveDate,
    /// Last date with hours reserved.
    pub end: NaiveDate,
    /// Hours actually reserved. Less than requested only when the scan cap
    /// was hit before the request was satisfied.
    pub hours: Decimal,
}

// ---------------------------------------------------------------------------
// AssigneeCapacityTracker
// ---------------------------------------------------------------------------

/// Mutable hour ledger for one assignee, exclusively owned by one planning
/// run. Re-running with fresh trackers from the same snapshot reproduces
/// identical allocations (`BTreeMap`/`BTreeSet` keep iteration stable).
#[derive(Debug, Clone)]
pub struct AssigneeCapacityTracker {
    account_id: String,
    display_name: String,
    role: Role,
    hours_per_day: Decimal,
    /// date → hours already committed on that date.
    committed: BTreeMap<NaiveDate, Decimal>,
    /// Absence dates: availability is forced to zero regardless of ledger.
    blocked: BTreeSet<NaiveDate>,
    total_assigned: Decimal,
}

impl AssigneeCapacityTracker {
    /// Build a fresh, empty ledger for one roster member.
    #[must_use]
    pub fn from_member(member: &TeamMember) -> Self {
        Self {
            account_id: member.account_id.clone(),
            display_name: member.display_name.clone(),
            role: member.role,
            hours_per_day: member.hours_per_day,
            committed: BTreeMap::new(),
            blocked: BTreeSet::new(),
            total_assigned: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn hours_per_day(&self) -> Decimal {
        self.hours_per_day
    }

    /// Hours already committed on `date` (zero when untouched).
    #[must_use]
    pub fn committed_on(&self, date: NaiveDate) -> Decimal {
        self.committed.get(&date).copied().unwrap_or(Decimal::ZERO)
    }

    /// Running total of all hours reserved on this ledger.
    #[must_use]
    pub const fn total_assigned(&self) -> Decimal {
        self.total_assigned
    }

    /// Snapshot of the daily load map for utilization reporting.
    #[must_use]
    pub const fn daily_load(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.committed
    }

    /// Free hours remaining on `date`: `max(0, hours_per_day − committed)`,
    /// forced to zero on absence dates.
    #[must_use]
    pub fn available_hours(&self, date: NaiveDate) -> Decimal {
        if self.blocked.contains(&date) {
            return Decimal::ZERO;
        }
        (self.hours_per_day - self.committed_on(date)).max(Decimal::ZERO)
    }

    /// Mark absence dates as fully unavailable. Idempotent; an empty set is
    /// a no-op.
    pub fn block_absences<I>(&mut self, dates: I)
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.blocked.extend(dates);
    }

    /// Reserve `hours` on `date`, adding to the ledger and the running total.
    ///
    /// Prefer [`AssigneeCapacityTracker::allocate`], which never asks for
    /// more than a date has left; a failure here is a contract violation.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::Exceeded`] when `hours` is greater than
    /// [`AssigneeCapacityTracker::available_hours`] for `date`.
    pub fn reserve_hours(&mut self, date: NaiveDate, hours: Decimal) -> Result<(), CapacityError> {
        let hours = round2(hours);
        let available = self.available_hours(date);
        if hours > available {
            return Err(CapacityError::Exceeded {
                account_id: self.account_id.clone(),
                date,
                requested: hours,
                available,
            });
        }
        let entry = self.committed.entry(date).or_insert(Decimal::ZERO);
        *entry = round2(*entry + hours);
        self.total_assigned = round2(self.total_assigned + hours);
        trace!(
            account_id = %self.account_id,
            %date,
            %hours,
            committed = %entry,
            "reserved hours"
        );
        Ok(())
    }

    /// First workday on/after `start` with any free hours.
    ///
    /// Advances one workday at a time, bounded by [`MAX_SCAN_DAYS`]; if the
    /// cap is exhausted the last date examined is returned rather than
    /// scanning forever.
    #[must_use]
    pub fn first_available_date(&self, start: NaiveDate, calendar: &dyn WorkCalendar) -> NaiveDate {
        let mut day = calendar.first_workday_on_or_after(start);
        for remaining in (0..MAX_SCAN_DAYS).rev() {
            // Advance only while iterations remain, so the cap covers every
            // date returned: at most 365 examined, the last one handed back.
            if remaining == 0 || self.available_hours(day) > Decimal::ZERO {
                break;
            }
            day = calendar.next_workday(day);
        }
        day
    }

    /// Greedily consume available hours day by day from the first available
    /// workday on/after `start_after`.
    ///
    /// Each visited workday reserves `min(remaining, available)`; the walk
    /// stops when the request is satisfied or [`MAX_SCAN_DAYS`] days have
    /// been visited. A request of zero (or negative) hours returns a
    /// zero-hour allocation anchored at `start_after` without touching the
    /// ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::Exceeded`] only if the internal reservation
    /// contract is violated, which indicates a bug rather than bad input.
    pub fn allocate(
        &mut self,
        hours_needed: Decimal,
        start_after: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> Result<Allocation, CapacityError> {
        let hours_needed = round2(hours_needed);
        if hours_needed <= Decimal::ZERO {
            return Ok(Allocation {
                start: start_after,
                end: start_after,
                hours: Decimal::ZERO,
            });
        }

        let first_day = self.first_available_date(start_after, calendar);
        let mut day = first_day;
        let mut remaining = hours_needed;
        let mut start: Option<NaiveDate> = None;
        let mut end = first_day;

        for _ in 0..MAX_SCAN_DAYS {
            let available = self.available_hours(day);
            if available > Decimal::ZERO {
                let slice = round2(remaining.min(available));
                self.reserve_hours(day, slice)?;
                start.get_or_insert(day);
                end = day;
                remaining = round2(remaining - slice);
                if remaining <= Decimal::ZERO {
                    break;
                }
            }
            day = calendar.next_workday(day);
        }

        let allocated = round2(hours_needed - remaining.max(Decimal::ZERO));
        trace!(
            account_id = %self.account_id,
            requested = %hours_needed,
            %allocated,
            "allocation complete"
        );
        Ok(Allocation {
            start: start.unwrap_or(first_day),
            end,
            hours: allocated,
        })
    }

    /// Run the [`AssigneeCapacityTracker::allocate`] algorithm against a
    /// disposable copy of the ledger — a dry-run projection that leaves the
    /// tracker's real state untouched.
    ///
    /// # Errors
    ///
    /// Same contract as [`AssigneeCapacityTracker::allocate`].
    pub fn simulate_allocate(
        &self,
        hours_needed: Decimal,
        start_after: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> Result<Allocation, CapacityError> {
        let mut scratch = self.clone();
        scratch.allocate(hours_needed, start_after, calendar)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
