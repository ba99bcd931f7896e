//! Grid compatibility checks and raster/vector CRS alignment.
//!
//! Binary presence rasters sourced from different mosaics are not guaranteed
//! to share a grid, and a silent misalignment corrupts every downstream
//! statistic. All pixel-wise operations go through [`require_same_grid`]
//! first; polygon masks are reprojected into the raster CRS, which is always
//! the reference frame.

use crate::types::{ChangeError, ChangeResult, Raster, Zone};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use geo::{LineString, MultiPolygon, Polygon};

/// Build a `SpatialRef` from a WKT string or an "EPSG:<code>" shorthand
pub(crate) fn spatial_ref_from(crs: &str) -> ChangeResult<SpatialRef> {
    if let Some(code) = crs.strip_prefix("EPSG:") {
        let code: u32 = code
            .parse()
            .map_err(|_| ChangeError::Processing(format!("Invalid EPSG code: {}", crs)))?;
        Ok(SpatialRef::from_epsg(code)?)
    } else {
        Ok(SpatialRef::from_wkt(crs)?)
    }
}

/// Verify that two rasters share an identical pixel grid.
///
/// Compatible means identical CRS, affine transform (within 1e-9), height,
/// and width. Anything else is a [`ChangeError::GridMismatch`]; pixel-wise
/// comparison on mismatched grids would misalign silently.
pub fn require_same_grid(a: &Raster, b: &Raster) -> ChangeResult<()> {
    if a.height() != b.height() || a.width() != b.width() {
        return Err(ChangeError::GridMismatch(format!(
            "Dimension mismatch: {}x{} vs {}x{}",
            a.height(),
            a.width(),
            b.height(),
            b.width()
        )));
    }
    if !a.transform.approx_eq(&b.transform) {
        return Err(ChangeError::GridMismatch(format!(
            "Transform mismatch: {:?} vs {:?}",
            a.transform, b.transform
        )));
    }
    if a.crs != b.crs {
        return Err(ChangeError::GridMismatch(format!(
            "CRS mismatch: '{}' vs '{}'",
            a.crs, b.crs
        )));
    }
    Ok(())
}

/// Reproject a zone's geometry into the CRS of the given raster.
///
/// Zones already expressed in the raster CRS are returned as-is. The raster
/// CRS is the reference frame: zone geometry moves, the raster never does.
pub fn reproject_to_raster_crs(zone: &Zone, raster_crs: &str) -> ChangeResult<Zone> {
    if zone.crs == raster_crs {
        return Ok(zone.clone());
    }

    log::debug!(
        "Reprojecting zone '{}' from '{}' to raster CRS",
        zone.name,
        zone.crs
    );

    let source = spatial_ref_from(&zone.crs)?;
    let target = spatial_ref_from(raster_crs)?;
    let transform = CoordTransform::new(&source, &target)?;

    let polygons = zone
        .geometry
        .0
        .iter()
        .map(|polygon| reproject_polygon(polygon, &transform))
        .collect::<ChangeResult<Vec<Polygon<f64>>>>()?;

    Ok(Zone {
        name: zone.name.clone(),
        geometry: MultiPolygon(polygons),
        crs: raster_crs.to_string(),
    })
}

fn reproject_polygon(
    polygon: &Polygon<f64>,
    transform: &CoordTransform,
) -> ChangeResult<Polygon<f64>> {
    let exterior = reproject_ring(polygon.exterior(), transform)?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| reproject_ring(ring, transform))
        .collect::<ChangeResult<Vec<LineString<f64>>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn reproject_ring(
    ring: &LineString<f64>,
    transform: &CoordTransform,
) -> ChangeResult<LineString<f64>> {
    let mut xs: Vec<f64> = ring.coords().map(|c| c.x).collect();
    let mut ys: Vec<f64> = ring.coords().map(|c| c.y).collect();
    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok(LineString::from(
        xs.into_iter().zip(ys).collect::<Vec<(f64, f64)>>(),
    ))
}
