//! The user's current selection: averaging period, hour-of-day window, city and metric.
//!
//! A [`FilterState`] can only be obtained through its validating builder, so every value
//! that reaches the filter and the derived computations is internally consistent.

use crate::types::calendar::{Month, UnknownMonth, Year};
use crate::types::city::city_key;
use crate::types::metric::Metric;
use bon::bon;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Highest valid hour of day.
pub const LAST_HOUR: u32 = 23;

/// Determines which calendar restriction the period predicate applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AveragingMode {
    /// Every year in the table.
    MultiYear,
    /// A single calendar year.
    Annual,
    /// A single calendar month, pooled over every year.
    Monthly,
}

impl Display for AveragingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AveragingMode::MultiYear => f.write_str("multi-year"),
            AveragingMode::Annual => f.write_str("annual"),
            AveragingMode::Monthly => f.write_str("monthly"),
        }
    }
}

/// The raw period value supplied alongside an [`AveragingMode`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodValue {
    Year(i32),
    Month(Month),
}

impl Display for PeriodValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PeriodValue::Year(year) => write!(f, "{year}"),
            PeriodValue::Month(month) => write!(f, "{month}"),
        }
    }
}

impl FromStr for PeriodValue {
    type Err = UnknownMonth;

    /// Integers parse as years, anything else must be a full month name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i32>() {
            Ok(year) => Ok(PeriodValue::Year(year)),
            Err(_) => s.parse::<Month>().map(PeriodValue::Month),
        }
    }
}

/// The validated period restriction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    AllYears,
    Year(Year),
    Month(Month),
}

impl Period {
    pub fn averaging_mode(self) -> AveragingMode {
        match self {
            Period::AllYears => AveragingMode::MultiYear,
            Period::Year(_) => AveragingMode::Annual,
            Period::Month(_) => AveragingMode::Monthly,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterStateError {
    #[error("{field} hour {hour} is outside 0..=23")]
    HourOutOfRange { field: &'static str, hour: u32 },

    #[error("Hour window start {start} is after end {end}")]
    HourRangeInverted { start: u32, end: u32 },

    #[error("Averaging mode {0} requires a period value")]
    MissingPeriod(AveragingMode),

    #[error("Period value {period} does not fit averaging mode {mode}")]
    PeriodMismatch {
        mode: AveragingMode,
        period: PeriodValue,
    },

    #[error("Year {0} is not a valid calendar year")]
    InvalidYear(i32),

    #[error(transparent)]
    UnknownMonth(#[from] UnknownMonth),

    #[error("{0} cannot be used as the selected metric")]
    MetricNotSelectable(Metric),
}

/// The current filter selection.
///
/// Built with [`FilterState::builder`], which rejects inconsistent selections instead of
/// letting them silently filter to nothing.
///
/// ```rust
/// use airshed::{AveragingMode, FilterState, Metric, Month, PeriodValue};
///
/// let state = FilterState::builder()
///     .averaging_mode(AveragingMode::Monthly)
///     .period_value(PeriodValue::Month(Month::February))
///     .hour_start(6)
///     .hour_end(18)
///     .selected_city("Denver")
///     .selected_metric(Metric::Ozone)
///     .build()?;
/// assert_eq!(state.hours_in_window(), 13);
///
/// let inverted = FilterState::builder()
///     .averaging_mode(AveragingMode::MultiYear)
///     .hour_start(12)
///     .hour_end(3)
///     .build();
/// assert!(inverted.is_err());
/// # Ok::<(), airshed::FilterStateError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterState {
    period: Period,
    hour_start: u32,
    hour_end: u32,
    selected_city: Option<String>,
    selected_metric: Metric,
}

#[bon]
impl FilterState {
    /// Validates and builds a filter state.
    ///
    /// * `averaging_mode`: **Required.**
    /// * `period_value`: required for `Annual` (a year) and `Monthly` (a month), ignored for
    ///   `MultiYear`.
    /// * `hour_start` / `hour_end`: inclusive hour window, defaults to the full day.
    /// * `selected_city`: optional; blank names count as no selection.
    /// * `selected_metric`: defaults to [`Metric::Temperature`].
    #[builder]
    pub fn new(
        averaging_mode: AveragingMode,
        period_value: Option<PeriodValue>,
        #[builder(default = 0)] hour_start: u32,
        #[builder(default = LAST_HOUR)] hour_end: u32,
        #[builder(into)] selected_city: Option<String>,
        #[builder(default = Metric::Temperature)] selected_metric: Metric,
    ) -> Result<Self, FilterStateError> {
        if hour_start > LAST_HOUR {
            return Err(FilterStateError::HourOutOfRange {
                field: "start",
                hour: hour_start,
            });
        }
        if hour_end > LAST_HOUR {
            return Err(FilterStateError::HourOutOfRange {
                field: "end",
                hour: hour_end,
            });
        }
        if hour_start > hour_end {
            return Err(FilterStateError::HourRangeInverted {
                start: hour_start,
                end: hour_end,
            });
        }
        if !selected_metric.is_selectable() {
            return Err(FilterStateError::MetricNotSelectable(selected_metric));
        }

        let period = match (averaging_mode, period_value) {
            (AveragingMode::MultiYear, _) => Period::AllYears,
            (AveragingMode::Annual, Some(PeriodValue::Year(year))) => {
                if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                    return Err(FilterStateError::InvalidYear(year));
                }
                Period::Year(Year(year))
            }
            (AveragingMode::Monthly, Some(PeriodValue::Month(month))) => Period::Month(month),
            (mode, None) => return Err(FilterStateError::MissingPeriod(mode)),
            (mode, Some(period)) => return Err(FilterStateError::PeriodMismatch { mode, period }),
        };

        let selected_city = selected_city.filter(|name| !name.trim().is_empty());

        Ok(Self {
            period,
            hour_start,
            hour_end,
            selected_city,
            selected_metric,
        })
    }
}

impl FilterState {
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn averaging_mode(&self) -> AveragingMode {
        self.period.averaging_mode()
    }

    pub fn hour_start(&self) -> u32 {
        self.hour_start
    }

    pub fn hour_end(&self) -> u32 {
        self.hour_end
    }

    /// Number of hours in the inclusive window.
    pub fn hours_in_window(&self) -> u32 {
        self.hour_end - self.hour_start + 1
    }

    pub fn selected_city(&self) -> Option<&str> {
        self.selected_city.as_deref()
    }

    /// Normalized key of the selected city, used for matching rows.
    pub fn selected_city_key(&self) -> Option<String> {
        self.selected_city.as_deref().map(city_key)
    }

    pub fn selected_metric(&self) -> Metric {
        self.selected_metric
    }

    /// Returns a copy of this state with a different city selection.
    pub fn with_selected_city(&self, city: Option<&str>) -> Self {
        Self {
            selected_city: city
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string),
            ..self.clone()
        }
    }
}
