//! In-memory image fixtures
//!
//! Noise images pass every Layer 0 pixel check; flat images fail blur and
//! blank checks. `jpeg_with_gps` splices a hand-built EXIF APP1 segment
//! into an encoded JPEG.

use chrono::NaiveDateTime;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Deterministic mid-grey noise (xorshift), sharp and well exposed
pub fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut state = 0x9e37_79b9u32;
    let img = GrayImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Luma([60 + (state % 136) as u8])
    });
    DynamicImage::ImageLuma8(img)
}

pub fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    noise_image(width, height)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

pub fn noise_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    noise_image(width, height)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 92))
        .unwrap();
    buf
}

pub fn flat_png(width: u32, height: u32, level: u8) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([level])))
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// EXIF contents for [`jpeg_with_gps`]
#[derive(Debug, Clone)]
pub struct ExifFixture {
    /// Signed decimal degrees
    pub lat: f64,
    pub lon: f64,
    pub captured_at: Option<NaiveDateTime>,
    pub make: &'static str,
    pub model: &'static str,
}

impl ExifFixture {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            captured_at: None,
            make: "TestCam",
            model: "Model 7",
        }
    }

    pub fn captured_at(mut self, at: NaiveDateTime) -> Self {
        self.captured_at = Some(at);
        self
    }
}

/// 400x400 noise JPEG carrying the given EXIF block
pub fn jpeg_with_gps(exif: &ExifFixture) -> Vec<u8> {
    let jpeg = noise_jpeg(400, 400);
    let tiff = build_tiff(exif);

    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    // Right after SOI
    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

const ASCII: u16 = 2;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Self {
            tag,
            kind: ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            kind: LONG,
            count: 1,
            data: value.to_le_bytes().to_vec(),
        }
    }

    fn rationals(tag: u16, values: &[(u32, u32)]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (num, den) in values {
            data.extend_from_slice(&num.to_le_bytes());
            data.extend_from_slice(&den.to_le_bytes());
        }
        Self {
            tag,
            kind: RATIONAL,
            count: values.len() as u32,
            data,
        }
    }

    fn external_len(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

fn ifd_len(entries: &[Entry]) -> usize {
    2 + 12 * entries.len() + 4 + entries.iter().map(Entry::external_len).sum::<usize>()
}

/// Serialize one IFD starting at `start` (offset from the TIFF header)
fn encode_ifd(entries: &[Entry], start: usize) -> Vec<u8> {
    let mut head = Vec::new();
    let mut data = Vec::new();
    let data_start = start + 2 + 12 * entries.len() + 4;

    head.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        head.extend_from_slice(&entry.tag.to_le_bytes());
        head.extend_from_slice(&entry.kind.to_le_bytes());
        head.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = entry.data.clone();
            inline.resize(4, 0);
            head.extend_from_slice(&inline);
        } else {
            head.extend_from_slice(&((data_start + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(&entry.data);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    head.extend_from_slice(&0u32.to_le_bytes());
    head.extend_from_slice(&data);
    head
}

fn dms(value: f64) -> [(u32, u32); 3] {
    let abs = value.abs();
    let degrees = abs.trunc();
    let minutes_f = (abs - degrees) * 60.0;
    let minutes = minutes_f.trunc();
    let seconds = (minutes_f - minutes) * 60.0;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 10_000.0).round() as u32, 10_000),
    ]
}

fn build_tiff(exif: &ExifFixture) -> Vec<u8> {
    let mut ifd0 = vec![
        Entry::ascii(0x010F, exif.make),
        Entry::ascii(0x0110, exif.model),
    ];
    if let Some(at) = exif.captured_at {
        ifd0.push(Entry::ascii(0x0132, &at.format("%Y:%m:%d %H:%M:%S").to_string()));
    }
    // GPSInfo pointer, patched below
    ifd0.push(Entry::long(0x8825, 0));

    let gps = vec![
        Entry::ascii(0x0001, if exif.lat >= 0.0 { "N" } else { "S" }),
        Entry::rationals(0x0002, &dms(exif.lat)),
        Entry::ascii(0x0003, if exif.lon >= 0.0 { "E" } else { "W" }),
        Entry::rationals(0x0004, &dms(exif.lon)),
    ];

    let ifd0_start = 8;
    let gps_start = ifd0_start + ifd_len(&ifd0);
    if let Some(pointer) = ifd0.last_mut() {
        pointer.data = (gps_start as u32).to_le_bytes().to_vec();
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&(ifd0_start as u32).to_le_bytes());
    tiff.extend_from_slice(&encode_ifd(&ifd0, ifd0_start));
    tiff.extend_from_slice(&encode_ifd(&gps, gps_start));
    tiff
}
