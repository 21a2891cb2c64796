//! Defines the `Observation` row type and the `WeatherGroup` categories attached to
//! every hourly record.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Coarse weather category of an hourly observation.
///
/// The upstream join collapses detailed condition codes into these five groups.
/// The variant order is the order used whenever results are grouped by weather.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum WeatherGroup {
    Clear,
    Cloudy,
    Fog,
    Rain,
    Snow,
}

impl WeatherGroup {
    pub const ALL: [WeatherGroup; 5] = [
        WeatherGroup::Clear,
        WeatherGroup::Cloudy,
        WeatherGroup::Fog,
        WeatherGroup::Rain,
        WeatherGroup::Snow,
    ];

    /// The label stored in the `weather_group` column.
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherGroup::Clear => "Clear",
            WeatherGroup::Cloudy => "Cloudy",
            WeatherGroup::Fog => "Fog",
            WeatherGroup::Rain => "Rain",
            WeatherGroup::Snow => "Snow",
        }
    }

    /// Parses a stored label. Case and surrounding whitespace are ignored.
    ///
    /// ```rust
    /// use airshed::WeatherGroup;
    ///
    /// assert_eq!(WeatherGroup::from_label("rain"), Some(WeatherGroup::Rain));
    /// assert_eq!(WeatherGroup::from_label("Drizzle"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|group| group.as_str().eq_ignore_ascii_case(label))
    }
}

impl Display for WeatherGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hourly record of the joined weather / air-quality table.
///
/// `timestamp` is wall-clock time local to the city. Calendar parts are derived
/// from it on demand and never stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    pub timestamp: NaiveDateTime,
    pub temperature_f: Option<f64>,
    pub ozone_ppb: Option<f64>,
    pub no2_ppb: Option<f64>,
    /// Direction the wind is coming from, in degrees.
    pub wind_direction_deg: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_group: WeatherGroup,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    pub fn day(&self) -> u32 {
        self.timestamp.day()
    }

    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }
}
