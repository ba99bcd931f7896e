//! Flat tabular and point-layer outputs.
//!
//! Area statistics and the regression sample table are written as CSV;
//! loss/gain point layers go out as GeoJSON feature collections.

use crate::core::samples::ELEVATION_COLUMN;
use crate::types::{AreaStatistic, ChangeResult, ExtentStatistic, Sample};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use std::path::Path;

/// Write (region, interval) area rows, raw counts and rounded hectares
pub fn write_area_statistics<P: AsRef<Path>>(
    stats: &[AreaStatistic],
    path: P,
) -> ChangeResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} area rows: {}", stats.len(), path.display());

    let mut writer = csv::Writer::from_path(path)?;
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write per-year presence extent rows
pub fn write_extent_statistics<P: AsRef<Path>>(
    stats: &[ExtentStatistic],
    path: P,
) -> ChangeResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} extent rows: {}", stats.len(), path.display());

    let mut writer = csv::Writer::from_path(path)?;
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

/// Column order of the sample table: fixed keys, then raw + normalized
/// columns per predictor (sorted by name), then elevation
pub fn sample_table_header(predictor_names: &[String]) -> Vec<String> {
    let mut header = vec![
        "x".to_string(),
        "y".to_string(),
        "interval".to_string(),
        "predictor_year".to_string(),
        "loss".to_string(),
    ];
    let mut names: Vec<String> = predictor_names.to_vec();
    names.sort();
    for name in &names {
        header.push(name.clone());
        header.push(format!("{}_norm", name));
    }
    header.push(ELEVATION_COLUMN.to_string());
    header.push(format!("{}_norm", ELEVATION_COLUMN));
    header
}

/// Write the finalized regression sample table.
///
/// Finalized samples are complete by construction; a sample lacking one of
/// the predictor columns would indicate a caller bug, so the lookup panics
/// via indexing rather than silently writing an empty cell.
pub fn write_sample_table<P: AsRef<Path>>(
    samples: &[Sample],
    predictor_names: &[String],
    path: P,
) -> ChangeResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} samples: {}", samples.len(), path.display());

    let header = sample_table_header(predictor_names);
    let mut names: Vec<String> = predictor_names.to_vec();
    names.sort();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&header)?;
    for sample in samples {
        let mut record = vec![
            sample.x.to_string(),
            sample.y.to_string(),
            sample.interval.clone(),
            sample.predictor_year.to_string(),
            sample.label.to_string(),
        ];
        for name in &names {
            record.push(sample.predictors[name].to_string());
            record.push(sample.normalized[name].to_string());
        }
        record.push(sample.elevation.to_string());
        record.push(sample.elevation_norm.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write pixel-center points as a GeoJSON feature collection.
///
/// Each feature carries the interval label so exported loss/gain layers
/// remain self-describing.
pub fn write_point_layer<P: AsRef<Path>>(
    points: &[(f64, f64)],
    interval: &str,
    path: P,
) -> ChangeResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} points: {}", points.len(), path.display());

    let features = points
        .iter()
        .map(|&(x, y)| {
            let mut properties = serde_json::Map::new();
            properties.insert("interval".to_string(), interval.into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![x, y]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    std::fs::write(path, GeoJson::from(collection).to_string())?;
    Ok(())
}
