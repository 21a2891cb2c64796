//! Per-city means over the all-cities subset, joined with city metadata for the map.

use crate::error::AirshedError;
use crate::table::observation_frame::ObservationFrame;
use crate::types::city::{city_key, CityDirectory, LatLon};
use crate::types::metric::{Metric, COL_CITY, COL_CITY_KEY, COL_NO2, COL_OZONE, COL_TEMPERATURE};
use log::{debug, warn};
use polars::prelude::{col, len, DataType, Expr, SortOptions};
use serde::Serialize;

const COL_ROWS: &str = "rows";

/// Mean over the group's values in ascending order, so the summation order and thus the
/// rounding does not depend on the order of the input rows.
fn ordered_mean(column: &str) -> Expr {
    col(column).sort(SortOptions::default()).mean()
}

/// Mean metrics of one city over the filtered window.
///
/// A mean is `None` when every value of that metric was missing in the window; it is
/// never reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAggregate {
    pub city: String,
    pub climate_label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub mean_temperature_f: Option<f64>,
    pub mean_ozone_ppb: Option<f64>,
    pub mean_no2_ppb: Option<f64>,
    /// Rows of this city in the window, including rows with missing metrics.
    pub observation_count: usize,
}

impl CityAggregate {
    /// The mean used to color the map for `metric`; `None` for the wind metrics.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.mean_temperature_f,
            Metric::Ozone => self.mean_ozone_ppb,
            Metric::No2 => self.mean_no2_ppb,
            Metric::WindSpeed | Metric::WindDirection => None,
        }
    }

    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }
}

/// Aggregated rows plus the cities that had data but no metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    /// One row per city with data, ordered by normalized city name.
    pub rows: Vec<CityAggregate>,
    /// Cities present in the subset but missing from the directory, in the same order.
    pub missing_metadata: Vec<String>,
}

impl AggregateReport {
    pub fn get(&self, city: &str) -> Option<&CityAggregate> {
        let key = city_key(city);
        self.rows.iter().find(|row| city_key(&row.city) == key)
    }
}

/// Groups `subset` by city and averages each metric over its non-missing values.
///
/// Cities with no rows in `subset` produce no aggregate. Cities without an entry in
/// `cities` are left out of [`AggregateReport::rows`], logged, and listed in
/// [`AggregateReport::missing_metadata`]; the other cities are unaffected.
///
/// Neither the output order nor the means depend on the row order of the input. When a
/// city is spelled differently across rows, the lexicographically smallest spelling is
/// reported.
pub fn aggregate_cities(
    subset: &ObservationFrame,
    cities: &CityDirectory,
) -> Result<AggregateReport, AirshedError> {
    let grouped = subset
        .lazy()
        .group_by_stable([col(COL_CITY_KEY)])
        .agg([
            col(COL_CITY).min(),
            ordered_mean(COL_TEMPERATURE),
            ordered_mean(COL_OZONE),
            ordered_mean(COL_NO2),
            len().cast(DataType::Int64).alias(COL_ROWS),
        ])
        .collect()?;

    let keys = grouped.column(COL_CITY_KEY)?.str()?;
    let names = grouped.column(COL_CITY)?.str()?;
    let temperature = grouped.column(COL_TEMPERATURE)?.f64()?;
    let ozone = grouped.column(COL_OZONE)?.f64()?;
    let no2 = grouped.column(COL_NO2)?.f64()?;
    let counts = grouped.column(COL_ROWS)?.i64()?;

    let mut keyed = Vec::with_capacity(grouped.height());
    for idx in 0..grouped.height() {
        let (Some(key), Some(name)) = (keys.get(idx), names.get(idx)) else {
            continue;
        };
        keyed.push((key.to_string(), name.to_string(), idx));
    }
    keyed.sort();

    let mut report = AggregateReport::default();
    for (_, name, idx) in keyed {
        let Some(info) = cities.get(&name) else {
            warn!("No metadata for city '{}'; leaving it off the aggregate", name);
            report.missing_metadata.push(name);
            continue;
        };
        report.rows.push(CityAggregate {
            city: name,
            climate_label: info.climate_label.clone(),
            latitude: info.latitude,
            longitude: info.longitude,
            mean_temperature_f: temperature.get(idx),
            mean_ozone_ppb: ozone.get(idx),
            mean_no2_ppb: no2.get(idx),
            observation_count: counts.get(idx).unwrap_or(0) as usize,
        });
    }

    debug!(
        "Aggregated {} cities ({} without metadata)",
        report.rows.len(),
        report.missing_metadata.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::observation_table::ObservationTable;
    use crate::test_fixtures::{fixture_directory, fixture_table, obs};
    use crate::types::observation::Observation;

    fn with_temperature(city: &str, hour: u32, temperature: Option<f64>) -> Observation {
        let mut row = obs(city, 2020, 3, 1, hour);
        row.temperature_f = temperature;
        row
    }

    #[test]
    fn test_mean_skips_missing_values() {
        let table = ObservationTable::from_observations(&[
            with_temperature("Austin", 0, Some(10.0)),
            with_temperature("Austin", 1, Some(20.0)),
            with_temperature("Austin", 2, None),
            with_temperature("Austin", 3, Some(30.0)),
        ])
        .unwrap();
        let report = aggregate_cities(&table.all(), &fixture_directory()).unwrap();
        let austin = report.get("Austin").unwrap();
        assert_eq!(austin.mean_temperature_f, Some(20.0));
        assert_eq!(austin.observation_count, 4);
        assert_eq!(austin.location(), LatLon(30.27, -97.74));
    }

    #[test]
    fn test_all_missing_metric_gives_none_but_keeps_row() {
        let table = ObservationTable::from_observations(&[
            with_temperature("Boston", 0, None),
            with_temperature("Boston", 1, None),
        ])
        .unwrap();
        let report = aggregate_cities(&table.all(), &fixture_directory()).unwrap();
        let boston = report.get("Boston").unwrap();
        assert_eq!(boston.mean_temperature_f, None);
        assert_eq!(boston.value(Metric::Temperature), None);
        assert_eq!(boston.mean_ozone_ppb, Some(30.0));
        assert_eq!(boston.value(Metric::Ozone), Some(30.0));
    }

    #[test]
    fn test_missing_metadata_is_reported_not_fatal() {
        let report = aggregate_cities(&fixture_table().all(), &fixture_directory()).unwrap();
        let cities: Vec<&str> = report.rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["Austin", "Boston"]);
        assert_eq!(report.missing_metadata, vec!["Ghost Town".to_string()]);
    }

    #[test]
    fn test_cities_without_rows_are_omitted() {
        let report = aggregate_cities(&fixture_table().all(), &fixture_directory()).unwrap();
        assert!(report.get("Denver").is_none());

        let empty = aggregate_cities(&fixture_table().empty(), &fixture_directory()).unwrap();
        assert!(empty.rows.is_empty());
        assert!(empty.missing_metadata.is_empty());
    }

    #[test]
    fn test_independent_of_row_order() {
        let mut rows = vec![
            with_temperature("Austin", 0, Some(70.0)),
            with_temperature("Boston", 0, Some(40.0)),
            with_temperature("Austin", 1, Some(75.0)),
            with_temperature("Boston", 1, None),
            with_temperature("Austin", 2, Some(80.0)),
        ];
        let forward = ObservationTable::from_observations(&rows).unwrap();
        rows.reverse();
        let backward = ObservationTable::from_observations(&rows).unwrap();

        let a = aggregate_cities(&forward.all(), &fixture_directory()).unwrap();
        let b = aggregate_cities(&backward.all(), &fixture_directory()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("Austin").unwrap().mean_temperature_f, Some(75.0));
    }

    #[test]
    fn test_mean_rounding_independent_of_row_order() {
        // Cancelling magnitudes make the float sum sensitive to summation order.
        let temperatures = [0.1, 0.2, 0.3, 1e16, -1e16, 0.7];
        let mut rows: Vec<Observation> = temperatures
            .iter()
            .enumerate()
            .map(|(hour, t)| with_temperature("Austin", hour as u32, Some(*t)))
            .collect();
        let forward = ObservationTable::from_observations(&rows).unwrap();
        rows.reverse();
        let backward = ObservationTable::from_observations(&rows).unwrap();
        rows.swap(0, 3);
        let shuffled = ObservationTable::from_observations(&rows).unwrap();

        let mean = |table: &ObservationTable| {
            aggregate_cities(&table.all(), &fixture_directory())
                .unwrap()
                .get("Austin")
                .unwrap()
                .mean_temperature_f
                .unwrap()
        };
        assert_eq!(mean(&forward).to_bits(), mean(&backward).to_bits());
        assert_eq!(mean(&forward).to_bits(), mean(&shuffled).to_bits());
    }

    #[test]
    fn test_city_spelling_independent_of_row_order() {
        let mut rows = vec![
            with_temperature("austin", 0, Some(70.0)),
            with_temperature(" Austin ", 1, Some(72.0)),
            with_temperature("AUSTIN", 2, Some(74.0)),
        ];
        let forward = ObservationTable::from_observations(&rows).unwrap();
        rows.reverse();
        let backward = ObservationTable::from_observations(&rows).unwrap();

        for table in [&forward, &backward] {
            let report = aggregate_cities(&table.all(), &fixture_directory()).unwrap();
            assert_eq!(report.rows.len(), 1);
            assert_eq!(report.rows[0].city, "AUSTIN");
            assert_eq!(report.rows[0].observation_count, 3);
            assert_eq!(table.cities().unwrap(), vec!["AUSTIN"]);
        }
    }
}
