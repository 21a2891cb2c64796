use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Column names of the observation table.
pub(crate) const COL_CITY: &str = "city";
pub(crate) const COL_CITY_KEY: &str = "city_key";
pub(crate) const COL_TIMESTAMP: &str = "timestamp";
pub(crate) const COL_TEMPERATURE: &str = "temperature_f";
pub(crate) const COL_OZONE: &str = "ozone_ppb";
pub(crate) const COL_NO2: &str = "no2_ppb";
pub(crate) const COL_WDIR: &str = "wind_direction_deg";
pub(crate) const COL_WSPD: &str = "wind_speed";
pub(crate) const COL_WEATHER_GROUP: &str = "weather_group";

/// A numeric quantity of the observation table.
///
/// The first three variants are the user-selectable metrics; the wind variants
/// exist so the histogram builders can address every numeric column uniformly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Temperature,
    Ozone,
    No2,
    WindSpeed,
    WindDirection,
}

impl Metric {
    /// Metrics a user can pick as the selected metric.
    pub const SELECTABLE: [Metric; 3] = [Metric::Temperature, Metric::Ozone, Metric::No2];

    pub fn column(self) -> &'static str {
        match self {
            Metric::Temperature => COL_TEMPERATURE,
            Metric::Ozone => COL_OZONE,
            Metric::No2 => COL_NO2,
            Metric::WindSpeed => COL_WSPD,
            Metric::WindDirection => COL_WDIR,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°F",
            Metric::Ozone | Metric::No2 => "ppb",
            Metric::WindSpeed => "mph",
            Metric::WindDirection => "°",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Ozone => "Ozone",
            Metric::No2 => "NO2",
            Metric::WindSpeed => "Wind speed",
            Metric::WindDirection => "Wind direction",
        }
    }

    pub fn is_selectable(self) -> bool {
        Self::SELECTABLE.contains(&self)
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.unit())
    }
}
