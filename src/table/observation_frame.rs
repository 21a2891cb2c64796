//! Contains the `ObservationFrame` structure: a filtered, collected subset of the
//! observation table handed to the derived computations and the presentation layer.

use crate::table::error::TableError;
use crate::types::metric::{Metric, COL_CITY, COL_TIMESTAMP, COL_WEATHER_GROUP};
use crate::types::observation::{Observation, WeatherGroup};
use chrono::{NaiveDateTime, Timelike};
use polars::prelude::{DataFrame, Float64Chunked, IntoLazy, LazyFrame};

/// A subset of observation rows sharing the table's schema.
///
/// Instances are produced by [`crate::time_window_filter`]. Column accessors keep missing
/// values as `None`; the pair accessor drops rows where either value is missing.
#[derive(Debug, Clone)]
pub struct ObservationFrame {
    frame: DataFrame,
}

impl ObservationFrame {
    pub(crate) fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Number of observation rows, regardless of missing metric values.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    fn metric_chunked(&self, metric: Metric) -> Result<&Float64Chunked, TableError> {
        let column = self
            .frame
            .column(metric.column())
            .map_err(|e| TableError::ColumnNotFound(metric.column().to_string(), e))?;
        Ok(column.f64()?)
    }

    /// Values of one metric column in row order, `None` where the measurement is missing.
    pub fn metric_values(&self, metric: Metric) -> Result<Vec<Option<f64>>, TableError> {
        Ok(self.metric_chunked(metric)?.into_iter().collect())
    }

    /// `(x, y)` pairs for rows where both metrics are present.
    pub fn metric_pairs(&self, x: Metric, y: Metric) -> Result<Vec<(f64, f64)>, TableError> {
        let xs = self.metric_chunked(x)?;
        let ys = self.metric_chunked(y)?;
        Ok(xs
            .into_iter()
            .zip(ys)
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }

    pub fn weather_groups(&self) -> Result<Vec<WeatherGroup>, TableError> {
        let labels = self.frame.column(COL_WEATHER_GROUP)?.str()?;
        labels
            .into_iter()
            .enumerate()
            .map(|(row, label)| {
                let label = label.ok_or_else(|| TableError::NullValue {
                    column: COL_WEATHER_GROUP.to_string(),
                    row,
                })?;
                WeatherGroup::from_label(label).ok_or_else(|| TableError::UnknownWeatherGroup {
                    label: label.to_string(),
                    row,
                })
            })
            .collect()
    }

    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>, TableError> {
        let timestamps = self.frame.column(COL_TIMESTAMP)?.datetime()?;
        timestamps
            .as_datetime_iter()
            .enumerate()
            .map(|(row, ts)| {
                ts.ok_or_else(|| TableError::NullValue {
                    column: COL_TIMESTAMP.to_string(),
                    row,
                })
            })
            .collect()
    }

    /// Local hour of day of every row.
    pub fn hours(&self) -> Result<Vec<u32>, TableError> {
        Ok(self.timestamps()?.iter().map(|ts| ts.hour()).collect())
    }

    /// Materializes the frame into typed rows, in frame order.
    pub fn rows(&self) -> Result<Vec<Observation>, TableError> {
        let cities = self.frame.column(COL_CITY)?.str()?;
        let timestamps = self.timestamps()?;
        let groups = self.weather_groups()?;
        let temperature = self.metric_values(Metric::Temperature)?;
        let ozone = self.metric_values(Metric::Ozone)?;
        let no2 = self.metric_values(Metric::No2)?;
        let direction = self.metric_values(Metric::WindDirection)?;
        let speed = self.metric_values(Metric::WindSpeed)?;

        cities
            .into_iter()
            .enumerate()
            .map(|(row, city)| {
                let city = city.ok_or_else(|| TableError::NullValue {
                    column: COL_CITY.to_string(),
                    row,
                })?;
                Ok(Observation {
                    city: city.to_string(),
                    timestamp: timestamps[row],
                    temperature_f: temperature[row],
                    ozone_ppb: ozone[row],
                    no2_ppb: no2[row],
                    wind_direction_deg: direction[row],
                    wind_speed: speed[row],
                    weather_group: groups[row],
                })
            })
            .collect()
    }
}
