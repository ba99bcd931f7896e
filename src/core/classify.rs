//! Pairwise change classification of binary presence rasters.
//!
//! Two snapshots of the same extent are reduced cell-wise to a four-state
//! category raster: loss, gain, no change, or nodata. The kernel is purely
//! pointwise, so the output is reproducible bit-for-bit from the two input
//! grids.

use crate::core::grid;
use crate::types::{
    CategoryGrid, ChangeCategory, ChangeRaster, ChangeResult, Interval, Raster, CHANGE_NODATA,
};
use ndarray::Zip;

/// A cell is presence iff it holds exactly 1; zero, the declared nodata
/// sentinel, and any stray value all count as absence.
const PRESENCE: f32 = 1.0;

/// Cell-wise change classifier for binary presence rasters
pub struct ChangeClassifier;

impl ChangeClassifier {
    /// Classify two presence rasters of one interval into a change raster.
    ///
    /// Both inputs must share an identical grid; anything else fails with
    /// `GridMismatch` before a single cell is compared. Category per cell,
    /// first match wins:
    ///
    /// 1. presence -> presence : NO_CHANGE (2)
    /// 2. presence -> absence  : LOSS (0)
    /// 3. absence  -> presence : GAIN (1)
    /// 4. absence  -> absence  : NODATA (255)
    pub fn classify(start: &Raster, end: &Raster) -> ChangeResult<ChangeRaster> {
        grid::require_same_grid(start, end)?;

        let mut categories: CategoryGrid =
            CategoryGrid::from_elem(start.data.raw_dim(), CHANGE_NODATA);

        Zip::from(&mut categories)
            .and(&start.data)
            .and(&end.data)
            .for_each(|category, &before, &after| {
                *category = Self::classify_cell(before, after).code();
            });

        Ok(ChangeRaster {
            data: categories,
            transform: start.transform.clone(),
            crs: start.crs.clone(),
        })
    }

    /// The pointwise truth table; a total function over any (start, end) pair
    #[inline]
    pub fn classify_cell(start: f32, end: f32) -> ChangeCategory {
        match (start == PRESENCE, end == PRESENCE) {
            (true, true) => ChangeCategory::NoChange,
            (true, false) => ChangeCategory::Loss,
            (false, true) => ChangeCategory::Gain,
            (false, false) => ChangeCategory::Nodata,
        }
    }
}

/// Outcome of classifying one interval in a batch
#[derive(Debug)]
pub enum IntervalOutcome {
    Classified {
        interval: Interval,
        change: ChangeRaster,
    },
    /// The interval was skipped (missing input, grid mismatch) and the
    /// reason recorded; other intervals are unaffected.
    Skipped { interval: Interval, reason: String },
}

impl IntervalOutcome {
    pub fn interval(&self) -> Interval {
        match self {
            IntervalOutcome::Classified { interval, .. } => *interval,
            IntervalOutcome::Skipped { interval, .. } => *interval,
        }
    }
}

/// Classify a fixed list of intervals, skipping failed ones.
///
/// `load` resolves the (start, end) presence rasters for one interval. A
/// failure to load or classify an interval becomes an inspectable
/// [`IntervalOutcome::Skipped`] rather than aborting the batch.
pub fn classify_intervals<F>(intervals: &[Interval], mut load: F) -> Vec<IntervalOutcome>
where
    F: FnMut(&Interval) -> ChangeResult<(Raster, Raster)>,
{
    intervals
        .iter()
        .map(|&interval| {
            let result = load(&interval)
                .and_then(|(start, end)| ChangeClassifier::classify(&start, &end));
            match result {
                Ok(change) => {
                    log::info!("Classified interval {}", interval);
                    IntervalOutcome::Classified { interval, change }
                }
                Err(e) => {
                    log::warn!("Skipping interval {}: {}", interval, e);
                    IntervalOutcome::Skipped {
                        interval,
                        reason: e.to_string(),
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeError, GeoTransform};
    use ndarray::array;

    fn transform(rows: usize) -> GeoTransform {
        GeoTransform {
            top_left_x: 0.0,
            pixel_width: 1.0,
            rotation_x: 0.0,
            top_left_y: rows as f64,
            rotation_y: 0.0,
            pixel_height: -1.0,
        }
    }

    fn presence(data: ndarray::Array2<f32>) -> Raster {
        let rows = data.nrows();
        Raster {
            data,
            transform: transform(rows),
            crs: "EPSG:4326".to_string(),
            nodata: Some(0.0),
        }
    }

    #[test]
    fn test_truth_table() {
        assert_eq!(
            ChangeClassifier::classify_cell(1.0, 1.0),
            ChangeCategory::NoChange
        );
        assert_eq!(
            ChangeClassifier::classify_cell(1.0, 0.0),
            ChangeCategory::Loss
        );
        assert_eq!(
            ChangeClassifier::classify_cell(0.0, 1.0),
            ChangeCategory::Gain
        );
        assert_eq!(
            ChangeClassifier::classify_cell(0.0, 0.0),
            ChangeCategory::Nodata
        );
    }

    #[test]
    fn test_non_binary_values_are_absence() {
        assert_eq!(
            ChangeClassifier::classify_cell(2.0, 1.0),
            ChangeCategory::Gain
        );
        assert_eq!(
            ChangeClassifier::classify_cell(1.0, 3.0),
            ChangeCategory::Loss
        );
        assert_eq!(
            ChangeClassifier::classify_cell(7.0, -1.0),
            ChangeCategory::Nodata
        );
    }

    #[test]
    fn test_two_by_two_scenario() {
        let start = presence(array![[1.0, 1.0], [0.0, 0.0]]);
        let end = presence(array![[1.0, 0.0], [1.0, 0.0]]);

        let change = ChangeClassifier::classify(&start, &end).unwrap();
        assert_eq!(
            change.data,
            array![
                [ChangeCategory::NoChange.code(), ChangeCategory::Loss.code()],
                [ChangeCategory::Gain.code(), CHANGE_NODATA]
            ]
        );
        assert_eq!(change.transform, start.transform);
        assert_eq!(change.crs, start.crs);
    }

    #[test]
    fn test_position_independence() {
        // The same (start, end) pair must classify identically wherever it
        // sits in the grid.
        let start = presence(array![[1.0, 0.0], [1.0, 0.0]]);
        let end = presence(array![[0.0, 1.0], [0.0, 1.0]]);
        let change = ChangeClassifier::classify(&start, &end).unwrap();
        assert_eq!(change.data[(0, 0)], change.data[(1, 0)]);
        assert_eq!(change.data[(0, 1)], change.data[(1, 1)]);
    }

    #[test]
    fn test_reproducible_bit_for_bit() {
        let start = presence(array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]]);
        let end = presence(array![[0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]);
        let first = ChangeClassifier::classify(&start, &end).unwrap();
        let second = ChangeClassifier::classify(&start, &end).unwrap();
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn test_grid_mismatch_aborts_classification() {
        let start = presence(array![[1.0, 1.0], [0.0, 0.0]]);
        let end = presence(array![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(matches!(
            ChangeClassifier::classify(&start, &end),
            Err(ChangeError::GridMismatch(_))
        ));
    }

    #[test]
    fn test_batch_skips_failed_interval() {
        let intervals = vec![Interval::new(1996, 2010), Interval::new(2010, 2015)];
        let outcomes = classify_intervals(&intervals, |interval| {
            if interval.start_year == 1996 {
                Err(ChangeError::MissingInput("mangroves_1996.tif".to_string()))
            } else {
                Ok((
                    presence(array![[1.0, 0.0], [1.0, 1.0]]),
                    presence(array![[0.0, 0.0], [1.0, 1.0]]),
                ))
            }
        });

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], IntervalOutcome::Skipped { .. }));
        assert!(matches!(outcomes[1], IntervalOutcome::Classified { .. }));
    }
}
