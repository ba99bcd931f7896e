//! Extraction of regression-ready samples from classified change rasters.
//!
//! Candidate pixels (loss or no-change) become geolocated rows joined with
//! predictor raster values looked up by coordinate. Each predictor keeps its
//! own grid, so lookups go coordinate -> row/col per raster rather than
//! assuming grid alignment with the change raster. Missing values propagate
//! as missing through normalization and are dropped at finalization.

use crate::types::{
    ChangeCategory, ChangeRaster, Interval, Raster, Sample,
};
use std::collections::BTreeMap;

/// Column key used for the elevation variable
pub const ELEVATION_COLUMN: &str = "elevation";

/// An unnormalized sample row; values may still be missing
#[derive(Debug, Clone)]
pub struct SampleDraft {
    pub x: f64,
    pub y: f64,
    pub interval: String,
    pub predictor_year: u16,
    pub label: u8,
    /// Raw value per predictor column; `None` = missing, never zero
    pub values: BTreeMap<String, Option<f64>>,
    pub elevation: Option<f64>,
}

/// Loss and gain pixel centers of one change raster
#[derive(Debug, Clone, Default)]
pub struct ChangePoints {
    pub loss: Vec<(f64, f64)>,
    pub gain: Vec<(f64, f64)>,
}

/// Converts change-raster pixels into predictor-joined sample rows
pub struct SampleExtractor;

impl SampleExtractor {
    /// Collect draft rows for one interval.
    ///
    /// Candidates are exactly the LOSS and NO_CHANGE cells (label 1 and 0);
    /// GAIN and NODATA cells never enter the sample set. Every name in
    /// `predictor_names` yields a column; a name absent from `predictors`
    /// (missing source file) records a missing value for every row.
    pub fn collect(
        change: &ChangeRaster,
        predictor_names: &[String],
        predictors: &BTreeMap<String, Raster>,
        elevation: Option<&Raster>,
        interval: &Interval,
    ) -> Vec<SampleDraft> {
        for name in predictor_names {
            if !predictors.contains_key(name) {
                log::warn!(
                    "Predictor '{}' missing for {}; recording missing values",
                    name,
                    interval
                );
            }
        }
        if elevation.is_none() {
            log::warn!("Elevation raster missing; recording missing values");
        }

        let mut drafts = Vec::new();
        for ((row, col), &code) in change.data.indexed_iter() {
            let label = match ChangeCategory::from_code(code) {
                Some(ChangeCategory::Loss) => 1,
                Some(ChangeCategory::NoChange) => 0,
                _ => continue,
            };
            let (x, y) = change.transform.pixel_center(row, col);

            // Out-of-bounds and nodata lookups come back as None from
            // Raster::sample and stay missing.
            let values = predictor_names
                .iter()
                .map(|name| {
                    let value = predictors.get(name).and_then(|r| r.sample(x, y));
                    (name.clone(), value)
                })
                .collect();

            drafts.push(SampleDraft {
                x,
                y,
                interval: interval.label(),
                predictor_year: interval.predictor_year(),
                label,
                values,
                elevation: elevation.and_then(|r| r.sample(x, y)),
            });
        }

        log::info!(
            "Collected {} candidate samples for {}",
            drafts.len(),
            interval
        );
        drafts
    }

    /// Normalize and finalize the assembled sample set of a whole run.
    ///
    /// Each column (every predictor plus elevation) is min-max normalized
    /// over all finite values across all drafts; a zero-variance column
    /// normalizes to 0 for every row. Rows with any missing raw or
    /// normalized field are then dropped: the returned table is complete by
    /// construction.
    pub fn finalize(drafts: Vec<SampleDraft>) -> Vec<Sample> {
        let mut columns: Vec<String> = drafts
            .iter()
            .flat_map(|d| d.values.keys().cloned())
            .collect();
        columns.sort();
        columns.dedup();

        let mut ranges: BTreeMap<String, Option<(f64, f64)>> = BTreeMap::new();
        for name in &columns {
            let range = column_range(drafts.iter().filter_map(|d| column_value(d, name)));
            ranges.insert(name.clone(), range);
        }
        let elevation_range = column_range(drafts.iter().filter_map(|d| d.elevation));

        let total = drafts.len();
        let mut samples = Vec::with_capacity(total);
        'row: for draft in drafts {
            let mut predictors = BTreeMap::new();
            let mut normalized = BTreeMap::new();
            for name in &columns {
                let raw = match column_value(&draft, name) {
                    Some(v) => v,
                    None => continue 'row,
                };
                let norm = match ranges[name].map(|r| normalize(raw, r)) {
                    Some(v) => v,
                    None => continue 'row,
                };
                predictors.insert(name.clone(), raw);
                normalized.insert(name.clone(), norm);
            }

            let elevation = match draft.elevation {
                Some(v) => v,
                None => continue 'row,
            };
            let elevation_norm = match elevation_range.map(|r| normalize(elevation, r)) {
                Some(v) => v,
                None => continue 'row,
            };

            samples.push(Sample {
                x: draft.x,
                y: draft.y,
                interval: draft.interval,
                predictor_year: draft.predictor_year,
                label: draft.label,
                predictors,
                normalized,
                elevation,
                elevation_norm,
            });
        }

        log::info!(
            "Finalized {} samples ({} dropped as incomplete)",
            samples.len(),
            total - samples.len()
        );
        samples
    }

    /// Project LOSS and GAIN cells to pixel-center points for export
    pub fn change_points(change: &ChangeRaster) -> ChangePoints {
        let mut points = ChangePoints::default();
        for ((row, col), &code) in change.data.indexed_iter() {
            match ChangeCategory::from_code(code) {
                Some(ChangeCategory::Loss) => {
                    points.loss.push(change.transform.pixel_center(row, col));
                }
                Some(ChangeCategory::Gain) => {
                    points.gain.push(change.transform.pixel_center(row, col));
                }
                _ => {}
            }
        }
        points
    }
}

fn column_value(draft: &SampleDraft, name: &str) -> Option<f64> {
    draft.values.get(name).copied().flatten()
}

/// (min, max) over the finite values of a column; `None` when no value is
/// finite, which marks the whole column as missing
fn column_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for value in values.filter(|v| v.is_finite()) {
        range = Some(match range {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }
    range
}

/// Min-max normalization; a zero-variance column maps every row to 0
fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoTransform, CHANGE_NODATA};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn north_up(rows: usize) -> GeoTransform {
        GeoTransform {
            top_left_x: 0.0,
            pixel_width: 1.0,
            rotation_x: 0.0,
            top_left_y: rows as f64,
            rotation_y: 0.0,
            pixel_height: -1.0,
        }
    }

    fn change(data: ndarray::Array2<u8>) -> ChangeRaster {
        let rows = data.nrows();
        ChangeRaster {
            data,
            transform: north_up(rows),
            crs: "EPSG:4326".to_string(),
        }
    }

    fn raster(data: ndarray::Array2<f32>, nodata: Option<f64>) -> Raster {
        let rows = data.nrows();
        Raster {
            data,
            transform: north_up(rows),
            crs: "EPSG:4326".to_string(),
            nodata,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidates_and_labels() {
        // LOSS and NO_CHANGE become rows; GAIN and NODATA do not.
        let change = change(array![[0, 1], [2, CHANGE_NODATA]]);
        let predictors = BTreeMap::new();
        let elevation = raster(array![[5.0, 5.0], [5.0, 5.0]], None);
        let interval = Interval::new(1996, 2010);

        let drafts =
            SampleExtractor::collect(&change, &[], &predictors, Some(&elevation), &interval);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].label, 1); // LOSS at (0, 0)
        assert_eq!(drafts[1].label, 0); // NO_CHANGE at (1, 0)
        assert_eq!(drafts[0].interval, "1996_2010");
        assert_eq!(drafts[0].predictor_year, 2010);
        // Pixel centers, not corners
        assert_relative_eq!(drafts[0].x, 0.5);
        assert_relative_eq!(drafts[0].y, 1.5);
    }

    #[test]
    fn test_predictor_lookup_uses_own_grid() {
        // Predictor grid is coarser than the change grid; the lookup must go
        // through coordinates, not shared indices.
        let change = change(array![[0, 0], [0, 0]]);
        let mut predictors = BTreeMap::new();
        let coarse = Raster {
            data: array![[42.0]],
            transform: GeoTransform {
                top_left_x: 0.0,
                pixel_width: 2.0,
                rotation_x: 0.0,
                top_left_y: 2.0,
                rotation_y: 0.0,
                pixel_height: -2.0,
            },
            crs: "EPSG:4326".to_string(),
            nodata: None,
        };
        predictors.insert("chirps".to_string(), coarse);
        let interval = Interval::new(2010, 2015);

        let drafts = SampleExtractor::collect(
            &change,
            &names(&["chirps"]),
            &predictors,
            None,
            &interval,
        );
        assert_eq!(drafts.len(), 4);
        for draft in &drafts {
            assert_eq!(draft.values["chirps"], Some(42.0));
        }
    }

    #[test]
    fn test_out_of_bounds_lookup_is_missing() {
        let change = change(array![[0, 0]]);
        let mut predictors = BTreeMap::new();
        // One-pixel predictor covering only the left half of the change grid
        predictors.insert(
            "lst".to_string(),
            raster(array![[7.0]], None),
        );
        let interval = Interval::new(2015, 2020);

        let drafts =
            SampleExtractor::collect(&change, &names(&["lst"]), &predictors, None, &interval);
        assert_eq!(drafts[0].values["lst"], Some(7.0));
        assert_eq!(drafts[1].values["lst"], None);
    }

    #[test]
    fn test_predictor_nodata_is_missing() {
        let change = change(array![[0, 0]]);
        let mut predictors = BTreeMap::new();
        predictors.insert(
            "lst".to_string(),
            raster(array![[-9999.0, 3.0]], Some(-9999.0)),
        );
        let interval = Interval::new(2015, 2020);

        let drafts =
            SampleExtractor::collect(&change, &names(&["lst"]), &predictors, None, &interval);
        assert_eq!(drafts[0].values["lst"], None);
        assert_eq!(drafts[1].values["lst"], Some(3.0));
    }

    #[test]
    fn test_normalization_law() {
        let change = change(array![[0, 0, 0]]);
        let mut predictors = BTreeMap::new();
        predictors.insert("chirps".to_string(), raster(array![[2.0, 4.0, 6.0]], None));
        let elevation = raster(array![[10.0, 10.0, 10.0]], None);
        let interval = Interval::new(1996, 2010);

        let drafts = SampleExtractor::collect(
            &change,
            &names(&["chirps"]),
            &predictors,
            Some(&elevation),
            &interval,
        );
        let samples = SampleExtractor::finalize(drafts);
        assert_eq!(samples.len(), 3);
        // Column min -> 0, column max -> 1, everything in [0, 1]
        assert_relative_eq!(samples[0].normalized["chirps"], 0.0);
        assert_relative_eq!(samples[1].normalized["chirps"], 0.5);
        assert_relative_eq!(samples[2].normalized["chirps"], 1.0);
        // Zero-variance column normalizes to 0, not NaN
        for sample in &samples {
            assert_relative_eq!(sample.elevation_norm, 0.0);
            assert_relative_eq!(sample.elevation, 10.0);
        }
    }

    #[test]
    fn test_completeness_drop() {
        let change = change(array![[0, 0]]);
        let mut predictors = BTreeMap::new();
        predictors.insert(
            "chirps".to_string(),
            raster(array![[1.0, -9999.0]], Some(-9999.0)),
        );
        let elevation = raster(array![[3.0, 4.0]], None);
        let interval = Interval::new(1996, 2010);

        let drafts = SampleExtractor::collect(
            &change,
            &names(&["chirps"]),
            &predictors,
            Some(&elevation),
            &interval,
        );
        let samples = SampleExtractor::finalize(drafts);
        // The second row had a missing predictor and must be gone.
        assert_eq!(samples.len(), 1);
        assert_relative_eq!(samples[0].predictors["chirps"], 1.0);
    }

    #[test]
    fn test_missing_predictor_drops_interval_rows_only() {
        // Interval A has no "chirps" raster at all; interval B is complete.
        let change_a = change(array![[0]]);
        let change_b = change(array![[2]]);
        let elevation = raster(array![[3.0]], None);
        let complete: BTreeMap<String, Raster> = [(
            "chirps".to_string(),
            raster(array![[5.0]], None),
        )]
        .into_iter()
        .collect();
        let empty = BTreeMap::new();
        let columns = names(&["chirps"]);

        let mut drafts = SampleExtractor::collect(
            &change_a,
            &columns,
            &empty,
            Some(&elevation),
            &Interval::new(1996, 2010),
        );
        drafts.extend(SampleExtractor::collect(
            &change_b,
            &columns,
            &complete,
            Some(&elevation),
            &Interval::new(2010, 2015),
        ));

        let samples = SampleExtractor::finalize(drafts);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].interval, "2010_2015");
    }

    #[test]
    fn test_change_points() {
        let change = change(array![[0, 1], [2, CHANGE_NODATA]]);
        let points = SampleExtractor::change_points(&change);
        assert_eq!(points.loss, vec![(0.5, 1.5)]);
        assert_eq!(points.gain, vec![(1.5, 1.5)]);
    }
}
