use anyhow::{Context, Result};
use nom_exif::*;
use serde::Serialize;
use std::path::Path;

/// The handful of EXIF fields shown when inspecting a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureInfo {
    pub date_taken: Option<String>,
    pub date_digitized: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
}

/// Read capture date, camera and location from an image file.
///
/// A file without EXIF yields an empty [`CaptureInfo`] rather than an error.
pub fn read_capture_info(path: &Path) -> Result<CaptureInfo> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(CaptureInfo::default());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let mut info = CaptureInfo {
        date_taken: exif.get(ExifTag::DateTimeOriginal).and_then(entry_to_string),
        date_digitized: exif.get(ExifTag::CreateDate).and_then(entry_to_string),
        make: exif.get(ExifTag::Make).and_then(entry_to_string),
        model: exif.get(ExifTag::Model).and_then(entry_to_string),
        ..CaptureInfo::default()
    };

    if let Some(gps) = gps_info {
        info.has_gps = true;
        info.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        info.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
    }

    Ok(info)
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    let coord = degrees + minutes / 60.0 + seconds / 3600.0;
    if reference == 'S' || reference == 'W' { -coord } else { coord }
}
