//! Data completeness of the selected city against a calendar-derived expected count.
//!
//! The expected count assumes one observation per hour in the window for every day of
//! the period, on a fixed 365-day calendar: leap days and February 29 are not modelled,
//! so a leap year with full coverage reports slightly over 100%. Results above 100% are
//! returned unchanged because they point at duplicate or extra rows in the source data.

use crate::filter_state::{FilterState, Period};
use crate::table::observation_frame::ObservationFrame;
use crate::types::calendar::DAYS_PER_YEAR;
use log::warn;
use serde::Serialize;

/// Row count and completeness of the selected city, for the summary display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub observation_count: usize,
    pub expected_count: u64,
    /// Percent of expected observations present, rounded to one decimal.
    pub completeness_percent: f64,
}

/// Number of hourly observations a complete record would hold for `state`.
///
/// * `MultiYear`: `365 * hours * num_years`
/// * `Annual`: `365 * hours`
/// * `Monthly`: `days_in_month * hours * num_years`, with February fixed at 28 days
pub fn expected_observations(state: &FilterState, num_years: u32) -> u64 {
    let hours = u64::from(state.hours_in_window());
    let num_years = u64::from(num_years);
    match state.period() {
        Period::AllYears => u64::from(DAYS_PER_YEAR) * hours * num_years,
        Period::Year(_) => u64::from(DAYS_PER_YEAR) * hours,
        Period::Month(month) => u64::from(month.days()) * hours * num_years,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percent of expected observations present in `subset`, rounded to one decimal.
///
/// Returns `None` when no city is selected. Every row counts, whether or not its metric
/// values are present.
pub fn completeness(
    subset: &ObservationFrame,
    state: &FilterState,
    num_years: u32,
) -> Option<f64> {
    summarize_city(subset, state, num_years).map(|summary| summary.completeness_percent)
}

/// Builds the [`CitySummary`] of the selected city, or `None` when no city is selected.
pub fn summarize_city(
    subset: &ObservationFrame,
    state: &FilterState,
    num_years: u32,
) -> Option<CitySummary> {
    let city = state.selected_city()?;
    let observation_count = subset.height();
    let expected_count = expected_observations(state, num_years.max(1));
    let completeness_percent =
        round_to_tenth(100.0 * observation_count as f64 / expected_count as f64);

    if completeness_percent > 100.0 {
        warn!(
            "Completeness for '{}' is {}% ({} rows, {} expected); check for duplicate rows",
            city, completeness_percent, observation_count, expected_count
        );
    }

    Some(CitySummary {
        city: city.to_string(),
        observation_count,
        expected_count,
        completeness_percent,
    })
}
