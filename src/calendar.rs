//! Due date calendar collaborator.
//!
//! The deadline calculator never does calendar arithmetic itself; it hands
//! (start, period, jurisdiction) to a [`CalendarProvider`] and trusts the
//! result. [`OfficeCalendar`] is the shipped implementation: weekends plus
//! a per-jurisdiction holiday table.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::CalendarError;

/// Duration of a deadline obligation.
///
/// `court_days = true` counts business days; otherwise calendar days with
/// the landing date rolled forward to the next business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePeriod {
    pub days: i64,
    pub court_days: bool,
}

impl DeadlinePeriod {
    pub fn calendar_days(days: i64) -> Self {
        Self {
            days,
            court_days: false,
        }
    }

    pub fn court_days(days: i64) -> Self {
        Self {
            days,
            court_days: true,
        }
    }
}

pub trait CalendarProvider: Send + Sync {
    /// Concrete due date for a period starting at `start` under the given
    /// jurisdiction's business-day rules.
    fn due_date(
        &self,
        start: NaiveDate,
        period: DeadlinePeriod,
        jurisdiction: &str,
    ) -> Result<NaiveDate, CalendarError>;
}

/// Weekend- and holiday-aware calendar for a fixed set of jurisdictions.
#[derive(Debug, Clone, Default)]
pub struct OfficeCalendar {
    holidays: HashMap<String, HashSet<NaiveDate>>,
}

impl OfficeCalendar {
    /// Calendar recognizing the given jurisdictions with no holidays.
    pub fn new<I, S>(jurisdictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let holidays = jurisdictions
            .into_iter()
            .map(|j| (j.as_ref().trim().to_ascii_uppercase(), HashSet::new()))
            .collect();
        Self { holidays }
    }

    /// Register office closure dates for a jurisdiction, adding the
    /// jurisdiction if it is new.
    pub fn with_holidays<I>(mut self, jurisdiction: &str, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.holidays
            .entry(jurisdiction.trim().to_ascii_uppercase())
            .or_default()
            .extend(dates);
        self
    }

    fn closures(&self, jurisdiction: &str) -> Result<&HashSet<NaiveDate>, CalendarError> {
        let key = jurisdiction.trim().to_ascii_uppercase();
        self.holidays
            .get(&key)
            .ok_or(CalendarError::UnsupportedJurisdiction(key))
    }

    fn is_business_day(date: NaiveDate, closures: &HashSet<NaiveDate>) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !closures.contains(&date)
    }
}

impl CalendarProvider for OfficeCalendar {
    fn due_date(
        &self,
        start: NaiveDate,
        period: DeadlinePeriod,
        jurisdiction: &str,
    ) -> Result<NaiveDate, CalendarError> {
        if period.days < 0 {
            return Err(CalendarError::Calculation(format!(
                "negative period of {} days",
                period.days
            )));
        }
        let closures = self.closures(jurisdiction)?;

        let overflow = || CalendarError::Calculation("due date out of range".to_string());

        if period.court_days {
            let mut cursor = start;
            let mut remaining = period.days;
            while remaining > 0 {
                cursor = cursor
                    .checked_add_signed(Duration::days(1))
                    .ok_or_else(overflow)?;
                if Self::is_business_day(cursor, closures) {
                    remaining -= 1;
                }
            }
            return Ok(cursor);
        }

        let mut due = start
            .checked_add_signed(Duration::days(period.days))
            .ok_or_else(overflow)?;
        while !Self::is_business_day(due, closures) {
            due = due
                .checked_add_signed(Duration::days(1))
                .ok_or_else(overflow)?;
        }
        Ok(due)
    }
}
