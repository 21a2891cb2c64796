//! Two-dimensional density grid over a pair of metrics (e.g. NO2 against ozone).
//!
//! Axis bounds come from the observed minimum and maximum of the subset, so the grid
//! follows the selected city and period. Bins are half-open `[low, high)`: a value on an
//! inner edge belongs to the higher bin. The axis maximum is the one exception and is
//! folded into the last bin so no observation falls off the grid.

use crate::config::ConfigError;
use crate::error::AirshedError;
use crate::table::observation_frame::ObservationFrame;
use crate::types::metric::Metric;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the axis range is divided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DensityBins {
    /// A fixed number of equal-width bins per axis.
    Count(usize),
    /// A fixed bin width; the number of bins follows from the axis range.
    Width(f64),
}

impl DensityBins {
    pub fn is_valid(self) -> bool {
        match self {
            DensityBins::Count(count) => count > 0,
            DensityBins::Width(width) => width.is_finite() && width > 0.0,
        }
    }
}

/// Binning of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBins {
    pub min: f64,
    pub max: f64,
    pub width: f64,
    pub n_bins: usize,
}

impl AxisBins {
    /// Axis spanning `values`, or `None` when there are no values.
    ///
    /// `bins` must be valid (see [`DensityBins::is_valid`]). A width far smaller than the
    /// range saturates the bin count instead of overflowing.
    pub fn from_values(values: &[f64], bins: DensityBins) -> Option<Self> {
        let min = values.iter().copied().map(OrderedFloat).min()?.0;
        let max = values.iter().copied().map(OrderedFloat).max()?.0;
        let range = max - min;
        let (width, n_bins) = match bins {
            DensityBins::Count(count) => (range / count as f64, count),
            DensityBins::Width(width) => (
                width,
                ((range / width).floor() as usize).saturating_add(1),
            ),
        };
        Some(Self {
            min,
            max,
            width,
            n_bins,
        })
    }

    /// Bin of `value`: `floor((value - min) / width)`, capped at the last bin.
    pub fn index(&self, value: f64) -> usize {
        if self.n_bins == 0 || self.width <= 0.0 || value <= self.min {
            return 0;
        }
        let idx = ((value - self.min) / self.width).floor() as usize;
        idx.min(self.n_bins - 1)
    }

    /// `[low, high)` edges of bin `idx`.
    pub fn edges(&self, idx: usize) -> (f64, f64) {
        let low = self.min + idx as f64 * self.width;
        (low, low + self.width)
    }
}

/// Sparse 2D count grid keyed by `(x_bin, y_bin)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityHistogram {
    pub x_metric: Metric,
    pub y_metric: Metric,
    /// `None` when no row had both metrics.
    pub x_axis: Option<AxisBins>,
    pub y_axis: Option<AxisBins>,
    pub cells: BTreeMap<(usize, usize), u64>,
    pub total: u64,
}

impl DensityHistogram {
    /// Bins complete `(x, y)` pairs. Pairs with a non-finite coordinate are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDensityBins`] for a zero count or a width that is not
    /// a positive finite number.
    pub fn from_pairs(
        pairs: &[(f64, f64)],
        x_metric: Metric,
        y_metric: Metric,
        bins: DensityBins,
    ) -> Result<Self, ConfigError> {
        if !bins.is_valid() {
            return Err(ConfigError::InvalidDensityBins(bins));
        }
        let pairs: Vec<(f64, f64)> = pairs
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
        let x_axis = AxisBins::from_values(&xs, bins);
        let y_axis = AxisBins::from_values(&ys, bins);

        let mut cells = BTreeMap::new();
        if let (Some(x_bins), Some(y_bins)) = (&x_axis, &y_axis) {
            for (x, y) in &pairs {
                *cells
                    .entry((x_bins.index(*x), y_bins.index(*y)))
                    .or_insert(0) += 1;
            }
        }

        Ok(Self {
            x_metric,
            y_metric,
            x_axis,
            y_axis,
            cells,
            total: pairs.len() as u64,
        })
    }

    pub fn count(&self, x_bin: usize, y_bin: usize) -> u64 {
        self.cells.get(&(x_bin, y_bin)).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Highest cell count, for scaling a color ramp.
    pub fn max_count(&self) -> u64 {
        self.cells.values().copied().max().unwrap_or(0)
    }
}

/// Builds the density grid of `subset` over `x_metric` and `y_metric`.
///
/// Rows missing either metric are dropped before the axis bounds are computed.
///
/// # Errors
///
/// Returns [`AirshedError::Config`] for invalid `bins` and [`AirshedError::Table`] if a
/// metric column cannot be read.
pub fn density_histogram(
    subset: &ObservationFrame,
    x_metric: Metric,
    y_metric: Metric,
    bins: DensityBins,
) -> Result<DensityHistogram, AirshedError> {
    let pairs = subset.metric_pairs(x_metric, y_metric)?;
    Ok(DensityHistogram::from_pairs(&pairs, x_metric, y_metric, bins)?)
}
