use geo::MultiPolygon;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cell values of a loaded single-band raster
pub type CellValue = f32;

/// 2D raster grid (row x col)
pub type RasterGrid = Array2<CellValue>;

/// 2D categorical change grid (row x col)
pub type CategoryGrid = Array2<u8>;

/// Nodata sentinel written to every change raster band
pub const CHANGE_NODATA: u8 = 255;

/// Change-raster category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeCategory {
    Loss = 0,
    Gain = 1,
    NoChange = 2,
    Nodata = 255,
}

impl ChangeCategory {
    pub fn from_code(code: u8) -> Option<ChangeCategory> {
        match code {
            0 => Some(ChangeCategory::Loss),
            1 => Some(ChangeCategory::Gain),
            2 => Some(ChangeCategory::NoChange),
            255 => Some(ChangeCategory::Nodata),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeCategory::Loss => write!(f, "loss"),
            ChangeCategory::Gain => write!(f, "gain"),
            ChangeCategory::NoChange => write!(f, "no_change"),
            ChangeCategory::Nodata => write!(f, "nodata"),
        }
    }
}

/// Affine georeferencing transform (GDAL six-parameter convention)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        GeoTransform {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Geographic coordinate of a pixel's center (not its corner)
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let col = col as f64 + 0.5;
        let row = row as f64 + 0.5;
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }

    /// Map a geographic coordinate to (row, col) pixel indices.
    ///
    /// Indices may be negative or exceed the grid when the coordinate falls
    /// outside the raster extent; callers bounds-check against the grid.
    /// Returns `None` only for a singular transform.
    pub fn pixel_index(&self, x: f64, y: f64) -> Option<(isize, isize)> {
        let det = self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = x - self.top_left_x;
        let dy = y - self.top_left_y;
        let col = (self.pixel_height * dx - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        Some((row.floor() as isize, col.floor() as isize))
    }

    /// True when both transforms describe the same pixel grid
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        let a = self.to_gdal();
        let b = other.to_gdal();
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }
}

/// A single-band georeferenced raster held fully in memory.
///
/// Transform and CRS are fixed at load time; the pipeline never mutates a
/// loaded raster in place.
#[derive(Debug, Clone)]
pub struct Raster {
    pub data: RasterGrid,
    pub transform: GeoTransform,
    /// CRS as WKT (or "EPSG:<code>" shorthand)
    pub crs: String,
    pub nodata: Option<f64>,
}

impl Raster {
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Look up the cell containing a geographic coordinate.
    ///
    /// Returns `None` when the coordinate falls outside the raster extent or
    /// the cell holds the nodata sentinel or a non-finite value. Missing
    /// stays missing: it is never coerced to zero here or downstream.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.transform.pixel_index(x, y)?;
        if row < 0 || col < 0 || row as usize >= self.height() || col as usize >= self.width() {
            return None;
        }
        let value = self.data[(row as usize, col as usize)] as f64;
        if !value.is_finite() {
            return None;
        }
        if let Some(nodata) = self.nodata {
            if value == nodata {
                return None;
            }
        }
        Some(value)
    }
}

/// Categorical change raster produced by one (start, end) classification.
///
/// Immutable after creation; nodata is always [`CHANGE_NODATA`].
#[derive(Debug, Clone)]
pub struct ChangeRaster {
    pub data: CategoryGrid,
    pub transform: GeoTransform,
    pub crs: String,
}

impl ChangeRaster {
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn category(&self, row: usize, col: usize) -> Option<ChangeCategory> {
        ChangeCategory::from_code(self.data[(row, col)])
    }
}

/// Named administrative region used as a read-only aggregation mask
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    /// CRS as WKT (or "EPSG:<code>" shorthand)
    pub crs: String,
}

/// A (start-year, end-year) analysis interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start_year: u16,
    pub end_year: u16,
}

impl Interval {
    pub fn new(start_year: u16, end_year: u16) -> Self {
        Interval {
            start_year,
            end_year,
        }
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.start_year, self.end_year)
    }

    /// Predictor rasters are keyed on the interval's end year
    pub fn predictor_year(&self) -> u16 {
        self.end_year
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.start_year, self.end_year)
    }
}

/// Area totals for one (region, interval) pair.
///
/// Raw pixel counts are kept alongside the rounded hectare values so that
/// downstream consumers can recompute areas at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaStatistic {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "Loss Pixels")]
    pub loss_pixels: u64,
    #[serde(rename = "Gain Pixels")]
    pub gain_pixels: u64,
    #[serde(rename = "No Change Pixels")]
    pub no_change_pixels: u64,
    #[serde(rename = "Loss (ha)")]
    pub loss_ha: f64,
    #[serde(rename = "Gain (ha)")]
    pub gain_ha: f64,
    #[serde(rename = "No Change (ha)")]
    pub no_change_ha: f64,
}

/// Presence extent of one binary raster snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentStatistic {
    #[serde(rename = "Year")]
    pub year: u16,
    #[serde(rename = "Presence Pixels")]
    pub pixels: u64,
    #[serde(rename = "Area (ha)")]
    pub area_ha: f64,
}

/// One finalized regression-ready sample row.
///
/// Finalized rows are complete by construction: normalization and the
/// completeness drop happen before a `Sample` is built, so every predictor
/// present in `predictors` also has a normalized counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub interval: String,
    pub predictor_year: u16,
    /// 1 = loss, 0 = no change
    pub label: u8,
    pub predictors: BTreeMap<String, f64>,
    pub normalized: BTreeMap<String, f64>,
    pub elevation: f64,
    pub elevation_norm: f64,
}

/// Error types for the change-analysis pipeline
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Degenerate zone '{zone}': {reason}")]
    DegenerateZone { zone: String, reason: String },

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for pipeline operations
pub type ChangeResult<T> = Result<T, ChangeError>;
