//! Input/output modules for raster, vector, and tabular data

pub mod raster;
pub mod vector;
pub mod tables;

pub use raster::{read_change_raster, read_raster, write_change_raster};
pub use tables::{
    write_area_statistics, write_extent_statistics, write_point_layer, write_sample_table,
};
pub use vector::{read_zones, DEFAULT_NAME_FIELD};
