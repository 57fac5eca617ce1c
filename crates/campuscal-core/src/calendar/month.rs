use std::fmt;

use chrono::{Datelike, Local, NaiveDate};

use super::merge::count_events;

/// Months fetched before the current one.
pub const DEFAULT_MONTHS_BEFORE: u32 = 3;

/// Months fetched after the current one.
pub const DEFAULT_MONTHS_AFTER: u32 = 7;

/// Upper bound for either side of a [`FetchWindow`], ten years.
pub const MAX_WINDOW_MONTHS: u32 = 120;

/// A calendar month, the unit of export and the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by a signed number of months, rolling over year boundaries.
    pub fn offset(self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// The portal's month token, e.g. `Y2024M05`.
    pub fn token(&self) -> String {
        format!("Y{:04}M{:02}", self.year, self.month)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The range of months fetched on every pass, relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub months_before: u32,
    pub months_after: u32,
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self {
            months_before: DEFAULT_MONTHS_BEFORE,
            months_after: DEFAULT_MONTHS_AFTER,
        }
    }
}

impl FetchWindow {
    pub fn new(months_before: u32, months_after: u32) -> Self {
        Self {
            months_before,
            months_after,
        }
    }

    /// Both sides, each capped at [`MAX_WINDOW_MONTHS`].
    fn bounds(&self) -> (u32, u32) {
        (
            self.months_before.min(MAX_WINDOW_MONTHS),
            self.months_after.min(MAX_WINDOW_MONTHS),
        )
    }

    /// Number of months in the window, the current month included.
    pub fn month_count(&self) -> usize {
        let (before, after) = self.bounds();
        (before + after + 1) as usize
    }

    /// Months of the window around `today`, oldest first.
    pub fn months_around(&self, today: NaiveDate) -> Vec<MonthKey> {
        let current = MonthKey::from_date(&today);
        let (before, after) = self.bounds();
        (-(before as i32)..=after as i32).map(|offset| current.offset(offset)).collect()
    }

    /// Months of the window around the local wall-clock date.
    pub fn current(&self) -> Vec<MonthKey> {
        self.months_around(Local::now().date_naive())
    }
}

/// One month's decoded calendar text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCalendar {
    month: MonthKey,
    text: String,
}

impl MonthCalendar {
    pub fn new(month: MonthKey, text: String) -> Self {
        Self { month, text }
    }

    pub fn month(&self) -> MonthKey {
        self.month
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn event_count(&self) -> usize {
        count_events(&self.text)
    }
}
