pub mod aggregate;
pub mod completeness;
pub mod density;
pub mod weather_groups;
pub mod wind_rose;
