//! ISO week arithmetic.
//!
//! Plans are keyed by ISO (year, week). Weeks run Monday to Sunday and
//! week 1 is the week holding the year's first Thursday, so late December
//! can belong to the next year's week 1 and early January to the previous
//! year's week 52 or 53.

use std::fmt;

use chrono::{Datelike, Days, Local, NaiveDate, Weekday};

/// Number of days in a plan.
pub const DAYS_PER_WEEK: i32 = 7;

/// An ISO week, always naming a week that exists on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    /// The Monday that starts the week.
    monday: NaiveDate,
}

impl WeekId {
    /// The ISO week `week` of ISO year `year`, or `None` if that week does
    /// not exist (week 0, or week 53 in a 52-week year).
    pub fn new(year: i32, week: u32) -> Option<Self> {
        week_start_date(year, week).map(|monday| Self { monday })
    }

    /// The ISO week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
        Self { monday }
    }

    /// ISO week-numbering year. Differs from the calendar year of
    /// [`Self::start_date`] near year boundaries.
    pub fn year(self) -> i32 {
        self.monday.iso_week().year()
    }

    /// Week number, 1 through 52 or 53.
    pub fn week(self) -> u32 {
        self.monday.iso_week().week()
    }

    pub fn start_date(self) -> NaiveDate {
        self.monday
    }

    /// The Sunday that ends the week.
    pub fn end_date(self) -> NaiveDate {
        self.monday
            .checked_add_days(Days::new(6))
            .unwrap_or(self.monday)
    }

    /// Calendar date of `day` (1 = Monday ... 7 = Sunday) in this week.
    pub fn date_of(self, day: i32) -> Option<NaiveDate> {
        if !(1..=DAYS_PER_WEEK).contains(&day) {
            return None;
        }
        self.monday.checked_add_days(Days::new((day - 1) as u64))
    }

    /// The week after this one.
    pub fn next(self) -> Option<Self> {
        self.monday
            .checked_add_days(Days::new(7))
            .map(|monday| Self { monday })
    }

    /// Human label, e.g. `Week 10, 2025`.
    pub fn label(self) -> String {
        format!("Week {}, {}", self.week(), self.year())
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year(), self.week())
    }
}

/// The ISO week of `now`.
pub fn current_week(now: NaiveDate) -> WeekId {
    WeekId::containing(now)
}

/// The ISO week of `now` plus seven days.
pub fn upcoming_week(now: NaiveDate) -> WeekId {
    let later = now.checked_add_days(Days::new(7)).unwrap_or(now);
    WeekId::containing(later)
}

/// The Monday beginning ISO week `week` of `year`.
pub fn week_start_date(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// 1-based ISO day index of `date`: 1 = Monday ... 7 = Sunday.
pub fn normalize_day_index(date: NaiveDate) -> i32 {
    date.weekday().number_from_monday() as i32
}

/// The (week, day) one calendar day after `day` of `week`, crossing into
/// the following week after Sunday.
pub fn day_after(week: WeekId, day: i32) -> Option<(WeekId, i32)> {
    let next = week.date_of(day)?.succ_opt()?;
    Some((WeekId::containing(next), normalize_day_index(next)))
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "today", so the current week can be pinned in tests.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Today's date in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock stuck on one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// A clock on the Monday of `week`.
    pub fn in_week(week: WeekId) -> Self {
        Self::new(week.start_date())
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
