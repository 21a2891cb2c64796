//! The immutable, polars-backed observation table every derived view is computed from.

use crate::table::error::TableError;
use crate::table::observation_frame::ObservationFrame;
use crate::types::city::city_key;
use crate::types::metric::{
    COL_CITY, COL_CITY_KEY, COL_NO2, COL_OZONE, COL_TEMPERATURE, COL_TIMESTAMP, COL_WDIR,
    COL_WEATHER_GROUP, COL_WSPD,
};
use crate::types::observation::{Observation, WeatherGroup};
use log::debug;
use polars::prelude::*;

const REQUIRED_COLUMNS: [&str; 8] = [
    COL_CITY,
    COL_TIMESTAMP,
    COL_TEMPERATURE,
    COL_OZONE,
    COL_NO2,
    COL_WDIR,
    COL_WSPD,
    COL_WEATHER_GROUP,
];

const COL_DUPLICATES: &str = "duplicates";
const COL_FIRST_YEAR: &str = "first_year";
const COL_LAST_YEAR: &str = "last_year";
const COL_YEAR: &str = "year";

/// Number of repeated timestamps found for one city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTimestamps {
    pub city: String,
    pub duplicates: usize,
}

/// The joined weather / air-quality table, one row per city and local hour.
///
/// The table is built once by the data loader and never mutated afterwards. Besides the
/// loader's columns it carries a normalized `city_key` column used for all city matching.
///
/// # Schema
///
/// | column               | type                    |
/// |----------------------|-------------------------|
/// | `city`               | String                  |
/// | `timestamp`          | Datetime (naive, local) |
/// | `temperature_f`      | Float64, nullable       |
/// | `ozone_ppb`          | Float64, nullable       |
/// | `no2_ppb`            | Float64, nullable       |
/// | `wind_direction_deg` | Float64, nullable       |
/// | `wind_speed`         | Float64, nullable       |
/// | `weather_group`      | String                  |
#[derive(Debug, Clone)]
pub struct ObservationTable {
    frame: DataFrame,
}

impl ObservationTable {
    /// Builds a table from typed rows.
    pub fn from_observations(observations: &[Observation]) -> Result<Self, TableError> {
        let timestamps = DatetimeChunked::from_naive_datetime(
            COL_TIMESTAMP.into(),
            observations.iter().map(|obs| obs.timestamp),
            TimeUnit::Milliseconds,
        );
        let cities: Vec<&str> = observations.iter().map(|obs| obs.city.as_str()).collect();
        let groups: Vec<&str> = observations
            .iter()
            .map(|obs| obs.weather_group.as_str())
            .collect();

        let frame = DataFrame::new(vec![
            Column::new(COL_CITY.into(), cities),
            Column::from(timestamps.into_series()),
            numeric_column(COL_TEMPERATURE, observations, |obs| obs.temperature_f),
            numeric_column(COL_OZONE, observations, |obs| obs.ozone_ppb),
            numeric_column(COL_NO2, observations, |obs| obs.no2_ppb),
            numeric_column(COL_WDIR, observations, |obs| obs.wind_direction_deg),
            numeric_column(COL_WSPD, observations, |obs| obs.wind_speed),
            Column::new(COL_WEATHER_GROUP.into(), groups),
        ])?;
        Self::from_frame(frame)
    }

    /// Wraps a `DataFrame` produced by a loader.
    ///
    /// The frame must contain every column of the schema above. Numeric columns are cast to
    /// `Float64`, extra columns are dropped, city names are trimmed and weather-group labels
    /// are canonicalized.
    ///
    /// # Errors
    ///
    /// * [`TableError::ColumnNotFound`] if a required column is missing.
    /// * [`TableError::ColumnType`] if `timestamp` is not a timezone-naive datetime.
    /// * [`TableError::NullValue`] for a missing city, timestamp or weather group.
    /// * [`TableError::UnknownWeatherGroup`] for labels outside the five known groups.
    pub fn from_frame(frame: DataFrame) -> Result<Self, TableError> {
        for name in REQUIRED_COLUMNS {
            frame
                .column(name)
                .map_err(|e| TableError::ColumnNotFound(name.to_string(), e))?;
        }

        let timestamp = frame.column(COL_TIMESTAMP)?;
        if !matches!(timestamp.dtype(), DataType::Datetime(_, None)) {
            return Err(TableError::ColumnType {
                column: COL_TIMESTAMP.to_string(),
                expected: "timezone-naive datetime",
                found: timestamp.dtype().to_string(),
            });
        }
        if let Some(row) = first_null(timestamp) {
            return Err(TableError::NullValue {
                column: COL_TIMESTAMP.to_string(),
                row,
            });
        }

        let mut frame = frame
            .lazy()
            .select([
                col(COL_CITY).strict_cast(DataType::String),
                col(COL_TIMESTAMP),
                col(COL_TEMPERATURE).strict_cast(DataType::Float64),
                col(COL_OZONE).strict_cast(DataType::Float64),
                col(COL_NO2).strict_cast(DataType::Float64),
                col(COL_WDIR).strict_cast(DataType::Float64),
                col(COL_WSPD).strict_cast(DataType::Float64),
                col(COL_WEATHER_GROUP).strict_cast(DataType::String),
            ])
            .collect()?;

        let (names, keys, groups) = {
            let cities = frame.column(COL_CITY)?.str()?;
            let mut names = Vec::with_capacity(cities.len());
            let mut keys = Vec::with_capacity(cities.len());
            for (row, city) in cities.into_iter().enumerate() {
                let city = city.ok_or_else(|| TableError::NullValue {
                    column: COL_CITY.to_string(),
                    row,
                })?;
                names.push(city.trim().to_string());
                keys.push(city_key(city));
            }

            let labels = frame.column(COL_WEATHER_GROUP)?.str()?;
            let mut groups = Vec::with_capacity(labels.len());
            for (row, label) in labels.into_iter().enumerate() {
                let label = label.ok_or_else(|| TableError::NullValue {
                    column: COL_WEATHER_GROUP.to_string(),
                    row,
                })?;
                let group = WeatherGroup::from_label(label).ok_or_else(|| {
                    TableError::UnknownWeatherGroup {
                        label: label.to_string(),
                        row,
                    }
                })?;
                groups.push(group.as_str());
            }
            (names, keys, groups)
        };

        frame.with_column(Column::new(COL_CITY.into(), names))?;
        frame.with_column(Column::new(COL_WEATHER_GROUP.into(), groups))?;
        frame.with_column(Column::new(COL_CITY_KEY.into(), keys))?;
        debug!("Observation table ready: {} rows", frame.height());

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// The whole table as a frame, without any filter applied.
    pub fn all(&self) -> ObservationFrame {
        ObservationFrame::new(self.frame.clone())
    }

    /// A frame with the table's schema and no rows.
    pub fn empty(&self) -> ObservationFrame {
        ObservationFrame::new(self.frame.clear())
    }

    /// Distinct city names, ordered by normalized key. A city spelled differently across
    /// rows is reported under its lexicographically smallest spelling.
    pub fn cities(&self) -> Result<Vec<String>, TableError> {
        let grouped = self
            .lazy()
            .group_by_stable([col(COL_CITY_KEY)])
            .agg([col(COL_CITY).min()])
            .collect()?;

        let keys = grouped.column(COL_CITY_KEY)?.str()?;
        let names = grouped.column(COL_CITY)?.str()?;
        let mut cities: Vec<(String, String)> = keys
            .into_iter()
            .zip(names)
            .filter_map(|(key, name)| Some((key?.to_string(), name?.to_string())))
            .collect();
        cities.sort();
        Ok(cities.into_iter().map(|(_, name)| name).collect())
    }

    /// First and last calendar year present, or `None` for an empty table.
    pub fn year_span(&self) -> Result<Option<(i32, i32)>, TableError> {
        let years = self
            .lazy()
            .select([
                col(COL_TIMESTAMP)
                    .dt()
                    .year()
                    .cast(DataType::Int32)
                    .min()
                    .alias(COL_FIRST_YEAR),
                col(COL_TIMESTAMP)
                    .dt()
                    .year()
                    .cast(DataType::Int32)
                    .max()
                    .alias(COL_LAST_YEAR),
            ])
            .collect()?;

        let first = years.column(COL_FIRST_YEAR)?.i32()?.get(0);
        let last = years.column(COL_LAST_YEAR)?.i32()?.get(0);
        Ok(first.zip(last))
    }

    /// Distinct calendar years with at least one row, ascending.
    pub fn years(&self) -> Result<Vec<i32>, TableError> {
        let years = self
            .lazy()
            .select([col(COL_TIMESTAMP)
                .dt()
                .year()
                .cast(DataType::Int32)
                .alias(COL_YEAR)])
            .collect()?;
        let mut years: Vec<i32> = years.column(COL_YEAR)?.i32()?.into_iter().flatten().collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Number of calendar years spanned by the table (first through last, inclusive).
    ///
    /// An empty table counts as one year so expected-count denominators stay positive.
    pub fn num_years(&self) -> Result<u32, TableError> {
        Ok(match self.year_span()? {
            Some((first, last)) => (last - first + 1).max(1) as u32,
            None => 1,
        })
    }

    /// Cities that contain the same timestamp more than once.
    pub fn duplicate_timestamps(&self) -> Result<Vec<DuplicateTimestamps>, TableError> {
        let grouped = self
            .lazy()
            .group_by_stable([col(COL_CITY_KEY)])
            .agg([
                col(COL_CITY).min(),
                (col(COL_TIMESTAMP).len().cast(DataType::Int64)
                    - col(COL_TIMESTAMP).n_unique().cast(DataType::Int64))
                .alias(COL_DUPLICATES),
            ])
            .filter(col(COL_DUPLICATES).gt(lit(0i64)))
            .collect()?;

        let names = grouped.column(COL_CITY)?.str()?;
        let counts = grouped.column(COL_DUPLICATES)?.i64()?;
        Ok(names
            .into_iter()
            .zip(counts)
            .filter_map(|(city, duplicates)| {
                Some(DuplicateTimestamps {
                    city: city?.to_string(),
                    duplicates: duplicates? as usize,
                })
            })
            .collect())
    }
}

fn numeric_column(
    name: &'static str,
    observations: &[Observation],
    value: impl Fn(&Observation) -> Option<f64>,
) -> Column {
    let values: Vec<Option<f64>> = observations.iter().map(value).collect();
    Column::new(name.into(), values)
}

fn first_null(column: &Column) -> Option<usize> {
    if column.null_count() == 0 {
        return None;
    }
    column
        .is_null()
        .into_iter()
        .position(|is_null| is_null == Some(true))
}
