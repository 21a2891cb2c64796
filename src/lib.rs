mod analysis;
mod config;
mod engine;
mod error;
mod filter_state;
mod filtering;
mod table;
mod types;

#[cfg(test)]
mod test_fixtures;

pub use config::*;
pub use engine::*;
pub use error::AirshedError;
pub use filter_state::*;
pub use filtering::{time_window_filter, Scope, TimeWindowFilterExt};

pub use analysis::aggregate::*;
pub use analysis::completeness::*;
pub use analysis::density::*;
pub use analysis::weather_groups::metric_by_weather_group;
pub use analysis::wind_rose::*;

pub use table::error::TableError;
pub use table::observation_frame::ObservationFrame;
pub use table::observation_table::{DuplicateTimestamps, ObservationTable};

pub use types::calendar::{Month, UnknownMonth, Year, DAYS_PER_YEAR};
pub use types::city::{city_key, CityDirectory, CityInfo, LatLon};
pub use types::metric::Metric;
pub use types::observation::{Observation, WeatherGroup};
