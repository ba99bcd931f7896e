//! Mangal: raster change detection and zonal statistics for land-cover analysis
//!
//! This library classifies pairs of binary presence rasters (e.g. annual
//! mangrove extent mosaics) into loss/gain/no-change rasters, aggregates the
//! results into per-region area statistics, and extracts geolocated,
//! predictor-joined sample tables for downstream regression.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AreaStatistic, ChangeCategory, ChangeError, ChangeRaster, ChangeResult, ExtentStatistic,
    GeoTransform, Interval, Raster, Sample, Zone, CHANGE_NODATA,
};

pub use crate::core::{
    classify_intervals, ChangeClassifier, IntervalOutcome, SampleExtractor, ZonalAggregator,
    ZoneOutcome,
};
