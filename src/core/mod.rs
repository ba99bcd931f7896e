//! Core change-analysis modules

pub mod grid;
pub mod classify;
pub mod zonal;
pub mod samples;

// Re-export main types
pub use classify::{classify_intervals, ChangeClassifier, IntervalOutcome};
pub use grid::{reproject_to_raster_crs, require_same_grid};
pub use samples::{ChangePoints, SampleDraft, SampleExtractor, ELEVATION_COLUMN};
pub use zonal::{
    pixel_area_ha, CategoryCounts, ZonalAggregator, ZoneOutcome, DEFAULT_PIXEL_SIDE_M,
    GLOBAL_REGION,
};
