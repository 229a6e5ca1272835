use std::fmt;

use serde::{Deserialize, Serialize};

pub const DAYS_PER_YEAR: u32 = 360;
pub const DAYS_PER_WEEK: u32 = 7;
pub const DAYS_PER_MONTH: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;

/// Simulation timestamp with day resolution: the engine's batch processes
/// tick daily at finest, so no sub-day precision is carried.
///
/// Derived ordering is chronological (`year` before `day`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTimestamp {
    pub year: u32,
    /// Day of year, 1–360.
    pub day: u32,
}

impl SimTimestamp {
    /// Create a timestamp from year and day-of-year (1–360).
    pub fn new(year: u32, day: u32) -> Self {
        assert!(
            (1..=DAYS_PER_YEAR).contains(&day),
            "day out of range: {day}"
        );
        Self { year, day }
    }

    /// First day of the given year.
    pub fn from_year(year: u32) -> Self {
        Self { year, day: 1 }
    }

    /// The timestamp one day later, rolling over at year end.
    pub fn next_day(self) -> Self {
        if self.day == DAYS_PER_YEAR {
            Self {
                year: self.year + 1,
                day: 1,
            }
        } else {
            Self {
                year: self.year,
                day: self.day + 1,
            }
        }
    }

    /// Month of year, 1–12 (30-day months).
    pub fn month(self) -> u32 {
        (self.day - 1) / DAYS_PER_MONTH + 1
    }

    /// Day within the current month, 1–30.
    pub fn day_of_month(self) -> u32 {
        (self.day - 1) % DAYS_PER_MONTH + 1
    }

    /// Total days elapsed since year 0, day 1. Useful for interval checks.
    pub fn days_since_epoch(self) -> u64 {
        self.year as u64 * DAYS_PER_YEAR as u64 + (self.day - 1) as u64
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Y{}.D{}", self.year, self.day)
    }
}
