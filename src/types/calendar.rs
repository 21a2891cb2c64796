//! Calendar primitives used by the period filter and the completeness model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Number of days assumed for every year in expected-count calculations.
///
/// Leap years are deliberately not modelled.
pub const DAYS_PER_YEAR: u32 = 365;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Year(pub i32);

impl Year {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month, independent of any year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month number, 1-based (January = 1).
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Converts a 1-based month number into a `Month`.
    pub fn from_number(number: u32) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx as usize).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Days in this month on the fixed, non-leap calendar (February is always 28).
    pub fn days(self) -> u32 {
        match self {
            Month::February => 28,
            Month::April | Month::June | Month::September | Month::November => 30,
            _ => 31,
        }
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string is not a full English month name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}' is not a month name")]
pub struct UnknownMonth(pub String);

impl FromStr for Month {
    type Err = UnknownMonth;

    /// Parses a full month name. Surrounding whitespace and letter case are ignored,
    /// but the name must match exactly ("Jun" or "Junee" are rejected).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|month| month.name().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownMonth(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_calendar_days() {
        assert_eq!(Month::February.days(), 28);
        for month in [Month::April, Month::June, Month::September, Month::November] {
            assert_eq!(month.days(), 30, "{month}");
        }
        for month in [
            Month::January,
            Month::March,
            Month::May,
            Month::July,
            Month::August,
            Month::October,
            Month::December,
        ] {
            assert_eq!(month.days(), 31, "{month}");
        }
        let total: u32 = Month::ALL.iter().map(|m| m.days()).sum();
        assert_eq!(total, DAYS_PER_YEAR);
    }

    #[test]
    fn test_parse_is_exact_after_normalizing() {
        assert_eq!(" february ".parse::<Month>(), Ok(Month::February));
        assert_eq!("MAY".parse::<Month>(), Ok(Month::May));
        assert!("Jun".parse::<Month>().is_err());
        assert!("Junee".parse::<Month>().is_err());
        assert!("".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_numbers() {
        assert_eq!(Month::January.number(), 1);
        assert_eq!(Month::December.number(), 12);
        assert_eq!(Month::from_number(2), Some(Month::February));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    #[test]
    fn test_year_display() {
        assert_eq!(Year(2021).to_string(), "2021");
        assert_eq!(Year(987).to_string(), "0987");
    }
}
