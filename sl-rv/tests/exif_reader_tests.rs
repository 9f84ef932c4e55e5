//! EXIF GPS extraction from real JPEG containers

mod helpers;

use chrono::NaiveDate;
use helpers::*;
use sl_rv::services::ExifGpsReader;

#[test]
fn reads_gps_camera_and_capture_time() {
    let taken = NaiveDate::from_ymd_opt(2024, 3, 14)
        .unwrap()
        .and_hms_opt(9, 26, 53)
        .unwrap();
    let image = jpeg_with_gps(&ExifFixture::at(31.5204, 74.3587).captured_at(taken));

    let metadata = ExifGpsReader::new().read(&image).unwrap();
    let gps = metadata.gps.expect("GPS present");

    assert!((gps.coordinates.lat - 31.5204).abs() < 1e-5);
    assert!((gps.coordinates.lon - 74.3587).abs() < 1e-5);
    assert_eq!(gps.altitude_m, None);
    assert_eq!(metadata.captured_at, Some(taken));
    assert_eq!(metadata.camera_make.as_deref(), Some("TestCam"));
    assert_eq!(metadata.camera_model.as_deref(), Some("Model 7"));
    assert!(metadata.field_count >= 7);
}

#[test]
fn southern_and_western_refs_are_negative() {
    let image = jpeg_with_gps(&ExifFixture::at(-33.8688, -70.6693));
    let gps = ExifGpsReader::new().read(&image).unwrap().gps.unwrap();

    assert!((gps.coordinates.lat + 33.8688).abs() < 1e-5);
    assert!((gps.coordinates.lon + 70.6693).abs() < 1e-5);
}

#[test]
fn jpeg_without_exif_has_no_metadata() {
    let metadata = ExifGpsReader::new().read(&noise_jpeg(320, 320)).unwrap();
    assert!(!metadata.has_gps());
    assert_eq!(metadata.captured_at, None);
    assert_eq!(metadata.field_count, 0);
}

#[test]
fn garbage_bytes_are_lenient() {
    let metadata = ExifGpsReader::new().read_lenient(b"definitely not an image");
    assert!(!metadata.has_gps());
}
