//! Zonal reduction of change rasters into area statistics.
//!
//! Counts of the three informative categories are converted to hectares via
//! the raster's native pixel size. Aggregation runs either over the whole
//! grid ("province" scope) or masked per administrative zone; each zone is
//! independent, so a degenerate geometry only omits that zone's row.

use crate::core::grid;
use crate::types::{
    AreaStatistic, ChangeCategory, ChangeRaster, ChangeResult, ChangeError, ExtentStatistic,
    Raster, Zone,
};
use geo::{BoundingRect, Contains, Point};
use rayon::prelude::*;

/// GMW mosaics are 25 m pixels; other sources configure their own
pub const DEFAULT_PIXEL_SIDE_M: f64 = 25.0;

/// Region key used for whole-grid aggregation rows
pub const GLOBAL_REGION: &str = "province";

/// Ground area of one pixel in hectares
pub fn pixel_area_ha(pixel_side_m: f64) -> f64 {
    pixel_side_m * pixel_side_m / 10_000.0
}

/// Hectare values are reported at 2 decimal places
fn round_ha(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Raw category pixel tallies for one mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub loss: u64,
    pub gain: u64,
    pub no_change: u64,
    /// Pixels covered by the mask, nodata included
    pub masked: u64,
}

impl CategoryCounts {
    fn add(&mut self, code: u8) {
        self.masked += 1;
        match ChangeCategory::from_code(code) {
            Some(ChangeCategory::Loss) => self.loss += 1,
            Some(ChangeCategory::Gain) => self.gain += 1,
            Some(ChangeCategory::NoChange) => self.no_change += 1,
            _ => {}
        }
    }

    fn into_statistic(self, region: &str, interval: &str, pixel_side_m: f64) -> AreaStatistic {
        let area = pixel_area_ha(pixel_side_m);
        AreaStatistic {
            region: region.to_string(),
            interval: interval.to_string(),
            loss_pixels: self.loss,
            gain_pixels: self.gain,
            no_change_pixels: self.no_change,
            loss_ha: round_ha(self.loss as f64 * area),
            gain_ha: round_ha(self.gain as f64 * area),
            no_change_ha: round_ha(self.no_change as f64 * area),
        }
    }
}

/// Per-zone aggregation outcome: a computed row, or a recorded omission.
///
/// Omissions are explicit so the report layer can list which zones were
/// dropped and why; a failed zone is never fabricated as a zero row.
#[derive(Debug)]
pub enum ZoneOutcome {
    Computed(AreaStatistic),
    Omitted { zone: String, reason: String },
}

impl ZoneOutcome {
    pub fn statistic(&self) -> Option<&AreaStatistic> {
        match self {
            ZoneOutcome::Computed(stat) => Some(stat),
            ZoneOutcome::Omitted { .. } => None,
        }
    }
}

/// Reduces change rasters to per-region area totals
#[derive(Debug, Clone)]
pub struct ZonalAggregator {
    pixel_side_m: f64,
}

impl Default for ZonalAggregator {
    fn default() -> Self {
        ZonalAggregator {
            pixel_side_m: DEFAULT_PIXEL_SIDE_M,
        }
    }
}

impl ZonalAggregator {
    pub fn new(pixel_side_m: f64) -> Self {
        ZonalAggregator { pixel_side_m }
    }

    /// Count categories over the entire grid and convert to hectares
    pub fn aggregate_global(&self, change: &ChangeRaster, interval: &str) -> AreaStatistic {
        let mut counts = CategoryCounts::default();
        for &code in change.data.iter() {
            counts.add(code);
        }
        counts.into_statistic(GLOBAL_REGION, interval, self.pixel_side_m)
    }

    /// Count categories over the pixels whose centers fall inside one zone.
    ///
    /// The zone is reprojected into the raster CRS first. A zone whose
    /// footprint covers no pixel centers is a `DegenerateZone` error.
    pub fn aggregate_zone(
        &self,
        change: &ChangeRaster,
        zone: &Zone,
        interval: &str,
    ) -> ChangeResult<AreaStatistic> {
        let zone = grid::reproject_to_raster_crs(zone, &change.crs)?;
        let counts = self.mask_counts(change, &zone)?;
        Ok(counts.into_statistic(&zone.name, interval, self.pixel_side_m))
    }

    /// Aggregate every zone independently, recording omissions.
    ///
    /// Zones are processed in parallel with no shared accumulator, so the
    /// resulting rows are identical regardless of iteration order, and a
    /// failure in one zone never aborts the others.
    pub fn aggregate_by_zone(
        &self,
        change: &ChangeRaster,
        zones: &[Zone],
        interval: &str,
    ) -> Vec<ZoneOutcome> {
        zones
            .par_iter()
            .map(|zone| match self.aggregate_zone(change, zone, interval) {
                Ok(stat) => ZoneOutcome::Computed(stat),
                Err(e) => {
                    log::warn!("Omitting zone '{}' for {}: {}", zone.name, interval, e);
                    ZoneOutcome::Omitted {
                        zone: zone.name.clone(),
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Presence extent of one binary snapshot (cells equal to 1)
    pub fn presence_extent(&self, raster: &Raster, year: u16) -> ExtentStatistic {
        let pixels = raster.data.iter().filter(|&&v| v == 1.0).count() as u64;
        ExtentStatistic {
            year,
            pixels,
            area_ha: round_ha(pixels as f64 * pixel_area_ha(self.pixel_side_m)),
        }
    }

    /// Tally categories inside the zone's footprint.
    ///
    /// The scan is restricted to the pixel window of the geometry's bounding
    /// rectangle; each pixel center in the window is tested against the
    /// polygon. Geometry intersection is inherently per-feature, so this is
    /// the one place the pipeline iterates scalar pixels.
    fn mask_counts(&self, change: &ChangeRaster, zone: &Zone) -> ChangeResult<CategoryCounts> {
        let rect = zone
            .geometry
            .bounding_rect()
            .ok_or_else(|| ChangeError::DegenerateZone {
                zone: zone.name.clone(),
                reason: "empty geometry".to_string(),
            })?;

        let (row_range, col_range) =
            pixel_window(change, rect.min().x, rect.min().y, rect.max().x, rect.max().y)
                .ok_or_else(|| ChangeError::DegenerateZone {
                    zone: zone.name.clone(),
                    reason: "zone does not intersect the raster extent".to_string(),
                })?;

        let mut counts = CategoryCounts::default();
        for row in row_range {
            for col in col_range.clone() {
                let (x, y) = change.transform.pixel_center(row, col);
                if zone.geometry.contains(&Point::new(x, y)) {
                    counts.add(change.data[(row, col)]);
                }
            }
        }

        if counts.masked == 0 {
            return Err(ChangeError::DegenerateZone {
                zone: zone.name.clone(),
                reason: "no pixel centers fall inside the zone".to_string(),
            });
        }
        Ok(counts)
    }
}

/// Clamp a geographic rectangle to the raster's pixel window.
///
/// Returns `None` when the rectangle lies entirely outside the grid.
fn pixel_window(
    change: &ChangeRaster,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let corners = [
        (min_x, min_y),
        (min_x, max_y),
        (max_x, min_y),
        (max_x, max_y),
    ];

    let mut row_min = isize::MAX;
    let mut row_max = isize::MIN;
    let mut col_min = isize::MAX;
    let mut col_max = isize::MIN;
    for (x, y) in corners {
        let (row, col) = change.transform.pixel_index(x, y)?;
        row_min = row_min.min(row);
        row_max = row_max.max(row);
        col_min = col_min.min(col);
        col_max = col_max.max(col);
    }

    let row_start = row_min.max(0) as usize;
    let row_end = ((row_max + 1).max(0) as usize).min(change.height());
    let col_start = col_min.max(0) as usize;
    let col_end = ((col_max + 1).max(0) as usize).min(change.width());
    if row_start >= row_end || col_start >= col_end {
        return None;
    }
    Some((row_start..row_end, col_start..col_end))
}
