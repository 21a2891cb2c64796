//! Synthetic tables shared by the unit tests.

use crate::table::observation_table::ObservationTable;
use crate::types::city::{CityDirectory, CityInfo};
use crate::types::observation::{Observation, WeatherGroup};
use chrono::NaiveDate;

/// A fully populated observation at the given local date and hour.
pub(crate) fn obs(city: &str, year: i32, month: u32, day: u32, hour: u32) -> Observation {
    Observation {
        city: city.to_string(),
        timestamp: NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap(),
        temperature_f: Some(70.0),
        ozone_ppb: Some(30.0),
        no2_ppb: Some(10.0),
        wind_direction_deg: Some(180.0),
        wind_speed: Some(5.0),
        weather_group: WeatherGroup::Clear,
    }
}

/// Rows for Austin, Boston and Ghost Town across 2019 and 2020.
///
/// * Austin: every hour of 2019-07-01, plus 2020-02-10 at 06, 12 and 18.
/// * Boston: 2019-02-01 08:00, 2020-07-15 08:00 and 20:00.
/// * Ghost Town: 2020-02-10 12:00 (absent from [`fixture_directory`]).
pub(crate) fn fixture_observations() -> Vec<Observation> {
    let mut rows: Vec<Observation> = (0..24).map(|h| obs("Austin", 2019, 7, 1, h)).collect();
    rows.extend([6, 12, 18].map(|h| obs("Austin", 2020, 2, 10, h)));
    rows.push(obs("Boston", 2019, 2, 1, 8));
    rows.push(obs("Boston", 2020, 7, 15, 8));
    rows.push(obs("Boston", 2020, 7, 15, 20));
    rows.push(obs("Ghost Town", 2020, 2, 10, 12));
    rows
}

pub(crate) fn fixture_table() -> ObservationTable {
    ObservationTable::from_observations(&fixture_observations()).unwrap()
}

pub(crate) fn city(name: &str, latitude: f64, longitude: f64) -> CityInfo {
    CityInfo {
        city: name.to_string(),
        latitude,
        longitude,
        climate_label: "Humid subtropical".to_string(),
    }
}

/// Metadata for Austin, Boston and Denver. Ghost Town is deliberately missing.
pub(crate) fn fixture_directory() -> CityDirectory {
    CityDirectory::new([
        city("Austin", 30.27, -97.74),
        city("Boston", 42.36, -71.06),
        city("Denver", 39.74, -104.99),
    ])
}
