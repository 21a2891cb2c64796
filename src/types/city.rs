//! Static per-city metadata (coordinates and climate label) and the directory used to
//! join it onto aggregated observations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element, longitude the second.
///
/// ```
/// use airshed::LatLon;
///
/// let phoenix = LatLon(33.45, -112.07);
/// assert_eq!(phoenix.0, 33.45);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// Metadata for one city, keyed by its name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityInfo {
    /// City name as it appears in the observation table (e.g. "Los Angeles").
    pub city: String,
    /// Latitude in decimal degrees (positive for North).
    pub latitude: f64,
    /// Longitude in decimal degrees (negative for West).
    pub longitude: f64,
    /// Free-form climate classification, e.g. "Hot desert".
    pub climate_label: String,
}

impl CityInfo {
    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }
}

/// Normalizes a city name into the key used for every city comparison.
///
/// Keys are trimmed and lowercased, so " Austin" and "austin" refer to the same city,
/// while "Portland" never matches "Portland ME".
pub fn city_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lookup table of [`CityInfo`] by normalized city key.
#[derive(Debug, Clone, Default)]
pub struct CityDirectory {
    cities: HashMap<String, CityInfo>,
}

impl CityDirectory {
    /// Builds a directory. When two entries normalize to the same key the later one wins.
    pub fn new(cities: impl IntoIterator<Item = CityInfo>) -> Self {
        let cities = cities
            .into_iter()
            .map(|info| (city_key(&info.city), info))
            .collect();
        Self { cities }
    }

    /// Parses a JSON array of city records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cities: Vec<CityInfo> = serde_json::from_str(json)?;
        Ok(Self::new(cities))
    }

    pub fn get(&self, city: &str) -> Option<&CityInfo> {
        self.cities.get(&city_key(city))
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityInfo> {
        self.cities.values()
    }
}
