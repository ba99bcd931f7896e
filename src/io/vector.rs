//! Administrative boundary loading.
//!
//! Zones come from any GDAL-readable vector source (GeoJSON in the
//! reference dataset). Each feature contributes one named polygon mask;
//! features without a usable name or polygonal geometry are skipped with a
//! warning rather than aborting the load.

use crate::types::{ChangeError, ChangeResult, Zone};
use gdal::vector::LayerAccess;
use gdal::Dataset;
use geo::{Geometry, MultiPolygon};
use std::path::Path;

/// Attribute carrying the region name in the reference boundary layer
pub const DEFAULT_NAME_FIELD: &str = "NAME_2";

/// Read named zones from the first layer of a vector dataset
pub fn read_zones<P: AsRef<Path>>(path: P, name_field: &str) -> ChangeResult<Vec<Zone>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChangeError::MissingInput(path.display().to_string()));
    }
    log::info!("Reading zones: {}", path.display());

    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;
    let crs = layer
        .spatial_ref()
        .and_then(|sr| sr.to_wkt().ok())
        .unwrap_or_default();

    let mut zones = Vec::new();
    for feature in layer.features() {
        let name = match feature.field(name_field)?.and_then(|f| f.into_string()) {
            Some(name) => name,
            None => {
                log::warn!("Skipping feature without '{}' attribute", name_field);
                continue;
            }
        };

        let geometry = match feature.geometry() {
            Some(g) => g.to_geo()?,
            None => {
                log::warn!("Skipping zone '{}' without geometry", name);
                continue;
            }
        };
        let geometry = match geometry {
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            Geometry::MultiPolygon(mp) => mp,
            _ => {
                log::warn!("Skipping zone '{}' with non-polygonal geometry", name);
                continue;
            }
        };

        zones.push(Zone {
            name,
            geometry,
            crs: crs.clone(),
        });
    }

    log::info!("Loaded {} zones", zones.len());
    Ok(zones)
}
