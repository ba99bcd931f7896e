use mangal::io::{read_change_raster, read_raster, write_change_raster};
use mangal::types::{ChangeError, ChangeRaster, GeoTransform, CHANGE_NODATA};
use ndarray::array;

#[test]
fn test_missing_raster_is_missing_input() {
    let err = read_raster("/nonexistent/mangroves_1996.tif").unwrap_err();
    assert!(matches!(err, ChangeError::MissingInput(_)));
}

#[test]
fn test_change_raster_geotiff_round_trip() {
    // Skip when the GTiff driver is unavailable in this GDAL build.
    if gdal::DriverManager::get_driver_by_name("GTiff").is_err() {
        println!("GTiff driver not available, skipping round-trip test");
        return;
    }

    let change = ChangeRaster {
        data: array![[0, 1, 2], [2, CHANGE_NODATA, 0]],
        transform: GeoTransform {
            top_left_x: 119.0,
            pixel_width: 0.001,
            rotation_x: 0.0,
            top_left_y: 10.5,
            rotation_y: 0.0,
            pixel_height: -0.001,
        },
        crs: "EPSG:4326".to_string(),
    };

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("change_1996_2010.tif");
    write_change_raster(&change, &path).expect("write change raster");

    let round_trip = read_change_raster(&path).expect("read change raster");
    assert_eq!(round_trip.data, change.data);
    assert!(round_trip.transform.approx_eq(&change.transform));
    assert!(!round_trip.crs.is_empty());

    // The nodata sentinel must be declared in the band metadata.
    let dataset = gdal::Dataset::open(&path).expect("open dataset");
    let band = dataset.rasterband(1).expect("band 1");
    assert_eq!(band.no_data_value(), Some(CHANGE_NODATA as f64));

    // The same file read as a generic raster keeps the declared nodata.
    let generic = read_raster(&path).expect("read as generic raster");
    assert_eq!(generic.nodata, Some(CHANGE_NODATA as f64));
    assert_eq!(generic.data[(0, 0)], 0.0);
    assert_eq!(generic.data[(1, 1)], CHANGE_NODATA as f32);
}
