//! EXIF metadata reader
//!
//! Pulls GPS position, capture time and camera identity out of the image's
//! EXIF block. A photo without EXIF, or with EXIF but no GPS, is normal and
//! yields empty fields rather than an error.

use chrono::NaiveDateTime;
use exif::{Exif, In, Rational, Tag, Value};
use sl_common::Coordinates;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

use crate::models::{PhotoGps, PhotoMetadata};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExifError {
    /// EXIF block present but unreadable, or the container is not an image
    #[error("Malformed EXIF data: {0}")]
    Malformed(String),
}

/// Reads photo metadata from raw image bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifGpsReader;

impl ExifGpsReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, bytes: &[u8]) -> Result<PhotoMetadata, ExifError> {
        let mut cursor = Cursor::new(bytes);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => {
                debug!("No EXIF block in image");
                return Ok(PhotoMetadata::default());
            }
            Err(e) => return Err(ExifError::Malformed(e.to_string())),
        };

        let metadata = PhotoMetadata {
            gps: read_gps(&exif),
            captured_at: read_capture_time(&exif),
            camera_make: ascii_field(&exif, Tag::Make),
            camera_model: ascii_field(&exif, Tag::Model),
            field_count: exif.fields().count(),
        };

        debug!(
            has_gps = metadata.gps.is_some(),
            fields = metadata.field_count,
            "Read EXIF metadata"
        );
        Ok(metadata)
    }

    /// Like [`read`](Self::read) but treats malformed EXIF as absent
    pub fn read_lenient(&self, bytes: &[u8]) -> PhotoMetadata {
        self.read(bytes).unwrap_or_else(|e| {
            debug!(error = %e, "Ignoring unreadable EXIF");
            PhotoMetadata::default()
        })
    }
}

/// Degrees/minutes/seconds to signed decimal degrees
///
/// `S` and `W` references are negative.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: char) -> f64 {
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    match reference.to_ascii_uppercase() {
        'S' | 'W' => -decimal,
        _ => decimal,
    }
}

fn read_gps(exif: &Exif) -> Option<PhotoGps> {
    let lat = coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
    let lon = coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
    let coordinates = Coordinates::new(lat, lon);

    if !coordinates.is_valid() {
        debug!(%coordinates, "EXIF GPS outside valid range, ignoring");
        return None;
    }

    Some(PhotoGps {
        coordinates,
        altitude_m: altitude(exif),
    })
}

fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let parts: Vec<f64> = match &field.value {
        Value::Rational(values) => values.iter().map(rational_to_f64).collect::<Option<_>>()?,
        _ => return None,
    };
    if parts.len() < 3 {
        return None;
    }

    let reference = ascii_field(exif, ref_tag)
        .and_then(|r| r.chars().next())
        .unwrap_or('N');

    Some(dms_to_decimal(parts[0], parts[1], parts[2], reference))
}

fn altitude(exif: &Exif) -> Option<f64> {
    let field = exif.get_field(Tag::GPSAltitude, In::PRIMARY)?;
    let meters = match &field.value {
        Value::Rational(values) => rational_to_f64(values.first()?)?,
        _ => return None,
    };
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);

    Some(if below_sea_level { -meters } else { meters })
}

fn read_capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| ascii_field(exif, tag))
        .find_map(|s| NaiveDateTime::parse_from_str(&s, EXIF_DATETIME_FORMAT).ok())
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => {
            let raw = values.first()?;
            let text = String::from_utf8_lossy(raw)
                .trim_end_matches('\0')
                .trim()
                .to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

fn rational_to_f64(r: &Rational) -> Option<f64> {
    (r.denom != 0).then(|| r.num as f64 / r.denom as f64)
}
