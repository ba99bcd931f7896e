//! GDAL-backed raster loading and writing.
//!
//! Rasters are read once, fully into memory, and treated as immutable for
//! the rest of the run. Only band 1 is consumed; the pipeline's inputs are
//! all single-band products.

use crate::types::{
    ChangeError, ChangeRaster, ChangeResult, GeoTransform, Raster, CHANGE_NODATA,
};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Read a single-band raster (presence, predictor, or elevation).
///
/// A path that does not exist is a `MissingInput` so callers can skip the
/// affected interval or predictor and record the omission.
pub fn read_raster<P: AsRef<Path>>(path: P) -> ChangeResult<Raster> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChangeError::MissingInput(path.display().to_string()));
    }
    log::info!("Reading raster: {}", path.display());

    let dataset = Dataset::open(path)?;
    let transform = GeoTransform::from_gdal(dataset.geo_transform()?);
    let crs = dataset.projection();
    let (width, height) = dataset.raster_size();
    log::debug!("Raster size: {}x{}", width, height);

    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let data = Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| ChangeError::Processing(format!("Failed to reshape raster data: {}", e)))?;

    Ok(Raster {
        data,
        transform,
        crs,
        nodata,
    })
}

/// Read a previously written change raster (band 1 as u8 category codes)
pub fn read_change_raster<P: AsRef<Path>>(path: P) -> ChangeResult<ChangeRaster> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChangeError::MissingInput(path.display().to_string()));
    }
    log::info!("Reading change raster: {}", path.display());

    let dataset = Dataset::open(path)?;
    let transform = GeoTransform::from_gdal(dataset.geo_transform()?);
    let crs = dataset.projection();
    let (width, height) = dataset.raster_size();

    let band = dataset.rasterband(1)?;
    let buffer = band.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
    let data = Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| ChangeError::Processing(format!("Failed to reshape raster data: {}", e)))?;

    Ok(ChangeRaster {
        data,
        transform,
        crs,
    })
}

/// Write a change raster as a single-band u8 GeoTIFF.
///
/// The source grid's transform and CRS are copied through unchanged and the
/// nodata sentinel (255) is declared in the band metadata.
pub fn write_change_raster<P: AsRef<Path>>(change: &ChangeRaster, path: P) -> ChangeResult<()> {
    let path = path.as_ref();
    log::info!("Writing change raster: {}", path.display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width) = change.data.dim();

    let mut dataset =
        driver.create_with_band_type::<u8, _>(path, width as isize, height as isize, 1)?;
    dataset.set_geo_transform(&change.transform.to_gdal())?;
    if !change.crs.is_empty() {
        dataset.set_spatial_ref(&crate::core::grid::spatial_ref_from(&change.crs)?)?;
    }

    let mut band = dataset.rasterband(1)?;
    let flat: Vec<u8> = change.data.iter().copied().collect();
    let buffer = gdal::raster::Buffer::new((width, height), flat);
    band.write((0, 0), (width, height), &buffer)?;
    band.set_no_data_value(Some(CHANGE_NODATA as f64))?;

    Ok(())
}
