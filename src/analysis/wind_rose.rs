//! Wind rose data: counts of observations per direction sector and speed bucket.
//!
//! Directions are meteorological ("wind coming from"), in degrees clockwise from North.
//! Sector 0 is centered on North, so with 12 sectors it spans 345°..15°.

use crate::config::{validate_wind_rose, ConfigError};
use crate::error::AirshedError;
use crate::table::observation_frame::ObservationFrame;
use crate::types::metric::Metric;
use serde::Serialize;

const COMPASS_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Sector index of `direction_deg` among `n_sectors` equal arcs, sector 0 centered on 0°.
///
/// Angles outside `0..360` are wrapped. `n_sectors` must be positive.
pub fn sector_index(direction_deg: f64, n_sectors: usize) -> usize {
    let width = 360.0 / n_sectors as f64;
    let shifted = (direction_deg + width / 2.0).rem_euclid(360.0);
    // Rounding can land exactly on 360 for angles just below North.
    (shifted / width).floor() as usize % n_sectors
}

/// Bucket index of `speed`: the number of cut points less than or equal to it.
pub fn speed_bucket(speed: f64, cut_points: &[f64]) -> usize {
    cut_points.partition_point(|cut| *cut <= speed)
}

/// One cell of the sector × bucket grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindRoseCell {
    pub sector: usize,
    pub bucket: usize,
    pub count: u64,
}

/// Dense sector × speed-bucket count grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularHistogram {
    n_sectors: usize,
    cut_points: Vec<f64>,
    /// Row-major: `counts[sector * n_buckets + bucket]`.
    counts: Vec<u64>,
    total: u64,
}

impl CircularHistogram {
    /// An all-zero grid.
    pub fn empty(n_sectors: usize, cut_points: &[f64]) -> Self {
        Self {
            n_sectors,
            cut_points: cut_points.to_vec(),
            counts: vec![0; n_sectors * (cut_points.len() + 1)],
            total: 0,
        }
    }

    /// Bins `(direction, speed)` readings. Readings missing either value, or holding a
    /// non-finite value, are skipped.
    pub fn from_readings(
        readings: impl IntoIterator<Item = (Option<f64>, Option<f64>)>,
        n_sectors: usize,
        cut_points: &[f64],
    ) -> Result<Self, ConfigError> {
        validate_wind_rose(n_sectors, cut_points)?;
        let mut histogram = Self::empty(n_sectors, cut_points);
        for (direction, speed) in readings {
            let (Some(direction), Some(speed)) = (direction, speed) else {
                continue;
            };
            if !direction.is_finite() || !speed.is_finite() {
                continue;
            }
            let sector = sector_index(direction, n_sectors);
            let bucket = speed_bucket(speed, cut_points);
            let idx = histogram.cell_index(sector, bucket);
            histogram.counts[idx] += 1;
            histogram.total += 1;
        }
        Ok(histogram)
    }

    fn cell_index(&self, sector: usize, bucket: usize) -> usize {
        sector * self.n_buckets() + bucket
    }

    pub fn n_sectors(&self) -> usize {
        self.n_sectors
    }

    /// Number of speed buckets, one more than the number of cut points.
    pub fn n_buckets(&self) -> usize {
        self.cut_points.len() + 1
    }

    pub fn cut_points(&self) -> &[f64] {
        &self.cut_points
    }

    pub fn sector_width(&self) -> f64 {
        360.0 / self.n_sectors as f64
    }

    /// Number of binned readings, the normalization base for [`Self::frequency`].
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Count of a cell, zero for indices outside the grid.
    pub fn count(&self, sector: usize, bucket: usize) -> u64 {
        if sector >= self.n_sectors || bucket >= self.n_buckets() {
            return 0;
        }
        self.counts[self.cell_index(sector, bucket)]
    }

    /// Share of all readings falling in a cell, in percent. Zero for an empty histogram.
    pub fn frequency(&self, sector: usize, bucket: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.count(sector, bucket) as f64 / self.total as f64
    }

    /// Every cell of the grid, zero cells included, sector-major.
    pub fn cells(&self) -> impl Iterator<Item = WindRoseCell> + '_ {
        let n_buckets = self.n_buckets();
        self.counts
            .iter()
            .enumerate()
            .map(move |(idx, count)| WindRoseCell {
                sector: idx / n_buckets,
                bucket: idx % n_buckets,
                count: *count,
            })
    }

    /// Total count of each sector over all speed buckets.
    pub fn sector_totals(&self) -> Vec<u64> {
        self.counts
            .chunks(self.n_buckets())
            .map(|sector| sector.iter().sum())
            .collect()
    }

    /// Direction at the center of a sector, in degrees.
    pub fn sector_center(&self, sector: usize) -> f64 {
        sector as f64 * self.sector_width()
    }

    /// Compass label for 4, 8 or 16 sectors ("N", "NE", ...), otherwise the center angle.
    pub fn sector_label(&self, sector: usize) -> String {
        match self.n_sectors {
            4 | 8 | 16 => {
                let step = 16 / self.n_sectors;
                COMPASS_16[(sector * step) % 16].to_string()
            }
            _ => format!("{}°", self.sector_center(sector)),
        }
    }

    /// Speed range label of a bucket: `<1`, `1-3`, ..., `50+`.
    pub fn bucket_label(&self, bucket: usize) -> String {
        let cuts = &self.cut_points;
        match (bucket.checked_sub(1).and_then(|i| cuts.get(i)), cuts.get(bucket)) {
            (None, Some(upper)) => format!("<{upper}"),
            (Some(lower), Some(upper)) => format!("{lower}-{upper}"),
            (Some(lower), None) => format!("{lower}+"),
            (None, None) => "all".to_string(),
        }
    }
}

/// Builds the wind rose grid of `subset`.
///
/// # Errors
///
/// Returns [`AirshedError::Config`] for zero sectors or cut points that are not finite and
/// strictly ascending.
pub fn circular_histogram(
    subset: &ObservationFrame,
    n_sectors: usize,
    speed_cut_points: &[f64],
) -> Result<CircularHistogram, AirshedError> {
    let directions = subset.metric_values(Metric::WindDirection)?;
    let speeds = subset.metric_values(Metric::WindSpeed)?;
    Ok(CircularHistogram::from_readings(
        directions.into_iter().zip(speeds),
        n_sectors,
        speed_cut_points,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::observation_table::ObservationTable;
    use crate::test_fixtures::obs;

    const CUTS: [f64; 7] = [1.0, 3.0, 5.0, 8.0, 12.0, 20.0, 50.0];

    fn wind(direction: Option<f64>, speed: Option<f64>) -> (Option<f64>, Option<f64>) {
        (direction, speed)
    }

    #[test]
    fn test_north_wraps_into_sector_zero() {
        let rose = CircularHistogram::from_readings([wind(Some(359.0), Some(2.0))], 12, &CUTS)
            .unwrap();
        assert_eq!(rose.count(0, 1), 1);
        assert_eq!(rose.count(11, 1), 0);
        assert_eq!(rose.total(), 1);
    }

    #[test]
    fn test_sector_boundaries() {
        // 12 sectors of 30°, sector 0 spans [345, 15).
        assert_eq!(sector_index(0.0, 12), 0);
        assert_eq!(sector_index(14.9, 12), 0);
        assert_eq!(sector_index(15.0, 12), 1);
        assert_eq!(sector_index(344.9, 12), 11);
        assert_eq!(sector_index(345.0, 12), 0);
        assert_eq!(sector_index(360.0, 12), 0);
        assert_eq!(sector_index(-10.0, 12), 0);
        assert_eq!(sector_index(180.0, 12), 6);
        assert_eq!(sector_index(359.999_999_999_999_9, 16), 0);
        assert_eq!(sector_index(90.0, 1), 0);
    }

    #[test]
    fn test_speed_buckets() {
        assert_eq!(speed_bucket(0.5, &CUTS), 0);
        assert_eq!(speed_bucket(1.0, &CUTS), 1);
        assert_eq!(speed_bucket(2.0, &CUTS), 1);
        assert_eq!(speed_bucket(3.0, &CUTS), 2);
        assert_eq!(speed_bucket(49.9, &CUTS), 6);
        assert_eq!(speed_bucket(50.0, &CUTS), 7);
        assert_eq!(speed_bucket(120.0, &CUTS), 7);
        assert_eq!(speed_bucket(4.0, &[]), 0);
    }

    #[test]
    fn test_cell_sum_matches_complete_readings() {
        let readings = vec![
            wind(Some(10.0), Some(4.0)),
            wind(Some(100.0), None),
            wind(None, Some(7.0)),
            wind(Some(200.0), Some(0.0)),
            wind(Some(275.0), Some(60.0)),
            wind(Some(f64::NAN), Some(2.0)),
        ];
        let complete = readings
            .iter()
            .filter(|(d, s)| matches!((d, s), (Some(d), Some(s)) if d.is_finite() && s.is_finite()))
            .count() as u64;
        let rose = CircularHistogram::from_readings(readings, 16, &CUTS).unwrap();
        let cell_sum: u64 = rose.cells().map(|cell| cell.count).sum();
        assert_eq!(cell_sum, complete);
        assert_eq!(rose.total(), 3);
    }

    #[test]
    fn test_full_grid_includes_zero_cells() {
        let rose = CircularHistogram::from_readings([wind(Some(90.0), Some(6.0))], 8, &CUTS)
            .unwrap();
        let cells: Vec<_> = rose.cells().collect();
        assert_eq!(cells.len(), 8 * 8);
        assert_eq!(cells.iter().filter(|c| c.count > 0).count(), 1);
        assert_eq!(rose.count(2, 3), 1);
        assert_eq!(rose.frequency(2, 3), 100.0);
        assert_eq!(rose.sector_totals()[2], 1);
        assert_eq!(rose.count(99, 0), 0);
    }

    #[test]
    fn test_empty_histogram() {
        let rose = CircularHistogram::from_readings(Vec::new(), 12, &CUTS).unwrap();
        assert!(rose.is_empty());
        assert_eq!(rose.cells().count(), 12 * 8);
        assert_eq!(rose.frequency(0, 0), 0.0);
    }

    #[test]
    fn test_labels() {
        let rose = CircularHistogram::empty(16, &CUTS);
        assert_eq!(rose.sector_label(0), "N");
        assert_eq!(rose.sector_label(4), "E");
        assert_eq!(rose.sector_label(15), "NNW");
        assert_eq!(rose.bucket_label(0), "<1");
        assert_eq!(rose.bucket_label(1), "1-3");
        assert_eq!(rose.bucket_label(7), "50+");

        let eight = CircularHistogram::empty(8, &CUTS);
        assert_eq!(eight.sector_label(1), "NE");

        let twelve = CircularHistogram::empty(12, &CUTS);
        assert_eq!(twelve.sector_label(1), "30°");
        assert_eq!(twelve.sector_center(3), 90.0);
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        assert!(CircularHistogram::from_readings(Vec::new(), 0, &CUTS).is_err());
        assert!(CircularHistogram::from_readings(Vec::new(), 12, &[3.0, 1.0]).is_err());
    }

    #[test]
    fn test_from_frame() {
        let mut calm = obs("Omaha", 2020, 4, 1, 0);
        calm.wind_direction_deg = Some(359.0);
        calm.wind_speed = Some(2.0);
        let mut missing = obs("Omaha", 2020, 4, 1, 1);
        missing.wind_speed = None;
        let table = ObservationTable::from_observations(&[calm, missing]).unwrap();

        let rose = circular_histogram(&table.all(), 12, &CUTS).unwrap();
        assert_eq!(rose.total(), 1);
        assert_eq!(rose.count(0, 1), 1);
    }
}
