use crate::error::AirshedError;
use crate::filter_state::{FilterState, Period};
use crate::table::observation_frame::ObservationFrame;
use crate::table::observation_table::ObservationTable;
use crate::types::metric::{COL_CITY_KEY, COL_TIMESTAMP};
use log::debug;
use polars::prelude::{col, lit, DataType, Expr, LazyFrame};

/// Which rows of the table a filtered subset may contain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Rows of every city.
    AllCities,
    /// Rows of the selected city only; empty when no city is selected.
    SingleCity,
}

pub trait TimeWindowFilterExt {
    /// Keeps rows whose local hour of day lies in `start..=end`.
    fn filter_hours(self, start: u32, end: u32) -> LazyFrame;

    /// Keeps rows of a calendar year, of a calendar month in any year, or everything.
    fn filter_period(self, period: Period) -> LazyFrame;

    /// Keeps rows whose normalized city key equals `key` exactly.
    fn filter_city(self, key: &str) -> LazyFrame;
}

fn hour_of_day() -> Expr {
    col(COL_TIMESTAMP).dt().hour().cast(DataType::Int32)
}

impl TimeWindowFilterExt for LazyFrame {
    fn filter_hours(self, start: u32, end: u32) -> LazyFrame {
        self.filter(
            hour_of_day()
                .gt_eq(lit(start as i32))
                .and(hour_of_day().lt_eq(lit(end as i32))),
        )
    }

    fn filter_period(self, period: Period) -> LazyFrame {
        match period {
            Period::AllYears => self,
            Period::Year(year) => self.filter(
                col(COL_TIMESTAMP)
                    .dt()
                    .year()
                    .cast(DataType::Int32)
                    .eq(lit(year.get())),
            ),
            Period::Month(month) => self.filter(
                col(COL_TIMESTAMP)
                    .dt()
                    .month()
                    .cast(DataType::Int32)
                    .eq(lit(month.number() as i32)),
            ),
        }
    }

    fn filter_city(self, key: &str) -> LazyFrame {
        self.filter(col(COL_CITY_KEY).eq(lit(key)))
    }
}

/// Applies the hour window, the period predicate and the scope of `state` to `table`.
///
/// Rows with missing metric values are kept; they are only skipped by the computations
/// that need those values. A `SingleCity` scope without a selected city yields an empty
/// frame rather than an error.
///
/// # Errors
///
/// Returns [`AirshedError::Polars`] if the lazy query fails to execute.
pub fn time_window_filter(
    table: &ObservationTable,
    state: &FilterState,
    scope: Scope,
) -> Result<ObservationFrame, AirshedError> {
    let city_key = match scope {
        Scope::AllCities => None,
        Scope::SingleCity => match state.selected_city_key() {
            Some(key) => Some(key),
            None => return Ok(table.empty()),
        },
    };

    let mut frame = table
        .lazy()
        .filter_hours(state.hour_start(), state.hour_end())
        .filter_period(state.period());
    if let Some(key) = &city_key {
        frame = frame.filter_city(key);
    }

    let frame = frame.collect()?;
    debug!(
        "Filtered {:?} subset for {:?}: {} rows",
        scope,
        state.period(),
        frame.height()
    );
    Ok(ObservationFrame::new(frame))
}
