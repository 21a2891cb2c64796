//! Tunable parameters of the derived views: wind rose geometry, density grid resolution
//! and the multi-year span used for completeness.

use crate::analysis::density::DensityBins;
use crate::types::metric::Metric;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SECTORS: usize = 16;
pub const DEFAULT_SPEED_CUT_POINTS: [f64; 7] = [1.0, 3.0, 5.0, 8.0, 12.0, 20.0, 50.0];
pub const DEFAULT_DENSITY_BINS: DensityBins = DensityBins::Count(20);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Wind rose needs at least one direction sector")]
    NoSectors,

    #[error("Speed cut point {index} ({value}) is not finite")]
    NonFiniteCutPoint { index: usize, value: f64 },

    #[error("Speed cut points must be strictly ascending (index {index})")]
    UnsortedCutPoints { index: usize },

    #[error("Density bins must be a positive count or a positive finite width, got {0:?}")]
    InvalidDensityBins(DensityBins),

    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config JSON")]
    Parse(#[from] serde_json::Error),
}

/// Engine configuration.
///
/// Every field has a default, so `EngineConfig::default()` and
/// `EngineConfig::builder().build()` are equivalent. When deserialized from JSON, missing
/// fields take their defaults too.
///
/// ```rust
/// use airshed::{DensityBins, EngineConfig};
///
/// let config = EngineConfig::builder()
///     .n_sectors(12)
///     .density_bins(DensityBins::Width(5.0))
///     .num_years_override(5)
///     .build();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.speed_cut_points.len(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of equal direction sectors in the wind rose; sector 0 is centered on North.
    #[builder(default = DEFAULT_SECTORS)]
    pub n_sectors: usize,

    /// Ascending wind speed thresholds separating the speed buckets.
    #[builder(default = DEFAULT_SPEED_CUT_POINTS.to_vec())]
    pub speed_cut_points: Vec<f64>,

    #[builder(default = DEFAULT_DENSITY_BINS)]
    pub density_bins: DensityBins,

    /// Metric on the density grid's x axis.
    #[builder(default = Metric::No2)]
    pub density_x: Metric,

    /// Metric on the density grid's y axis.
    #[builder(default = Metric::Ozone)]
    pub density_y: Metric,

    /// Overrides the number of years derived from the table's span.
    pub num_years_override: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_wind_rose(self.n_sectors, &self.speed_cut_points)?;
        if !self.density_bins.is_valid() {
            return Err(ConfigError::InvalidDensityBins(self.density_bins));
        }
        Ok(())
    }
}

pub(crate) fn validate_wind_rose(n_sectors: usize, cut_points: &[f64]) -> Result<(), ConfigError> {
    if n_sectors == 0 {
        return Err(ConfigError::NoSectors);
    }
    for (index, value) in cut_points.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteCutPoint { index, value });
        }
    }
    if let Some(index) = cut_points.windows(2).position(|pair| pair[0] >= pair[1]) {
        return Err(ConfigError::UnsortedCutPoints { index: index + 1 });
    }
    Ok(())
}
