use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};
use std::io::{self, Write};
use std::path::Path;

use super::container::{MetadataContainer, SectionKind, TagValue, tag};
use super::tiff;
use crate::date::DateTaken;
use crate::error::EncodeError;
use crate::gps::GpsRational;

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

// Segment length is a u16 that counts its own two bytes
const MAX_SEGMENT_CONTENTS: usize = u16::MAX as usize - 2;

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Decode the EXIF container of a JPEG.
///
/// A JPEG without EXIF, or with EXIF that cannot be parsed, yields an empty container.
pub fn read_container(jpeg: &Jpeg) -> MetadataContainer {
    let Some(pos) = find_exif_segment_pos(jpeg) else {
        log::debug!("  No EXIF segment, starting from an empty container");
        return MetadataContainer::empty();
    };

    let contents = jpeg.segments()[pos].contents();
    match tiff::decode(&contents[EXIF_PREFIX.len()..]) {
        Ok(container) => {
            log::debug!(
                "  Loaded EXIF: {} image, {} photo, {} gps, {} thumbnail tags",
                container.image.len(),
                container.photo.len(),
                container.gps.len(),
                container.thumbnail.len()
            );
            container
        }
        Err(e) => {
            log::warn!("  Unreadable EXIF ({e}), replacing it with an empty container");
            MetadataContainer::empty()
        }
    }
}

/// Set DateTimeOriginal and DateTimeDigitized, leaving every other tag as it was.
pub fn apply_capture_date(container: &mut MetadataContainer, date: &DateTaken) {
    let photo = container.section_mut(SectionKind::Photo);
    for tag_id in [tag::DATE_TIME_ORIGINAL, tag::DATE_TIME_DIGITIZED] {
        photo.insert(tag_id, TagValue::ascii(date.as_str()));
    }
}

/// Replace the whole GPS section with the given location.
pub fn apply_location(container: &mut MetadataContainer, gps: &GpsRational) {
    *container.section_mut(SectionKind::Gps) = gps.to_section();
}

/// Encode the container and store it as the JPEG's EXIF segment.
///
/// An existing EXIF segment is replaced in place; otherwise the new one goes right after
/// the JFIF APP0 segment, or first if there is none. Every other segment, and the image
/// data, is left alone.
pub fn embed_container(jpeg: &mut Jpeg, container: &MetadataContainer) -> Result<(), EncodeError> {
    let tiff_data = tiff::encode(container);

    let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + tiff_data.len());
    contents.extend_from_slice(EXIF_PREFIX);
    contents.extend_from_slice(&tiff_data);
    if contents.len() > MAX_SEGMENT_CONTENTS {
        return Err(EncodeError::TooLarge(contents.len()));
    }

    let existing = find_exif_segment_pos(jpeg);
    let segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));
    let segments = jpeg.segments_mut();
    match existing {
        Some(pos) => segments[pos] = segment,
        None => {
            let pos = match segments.first() {
                Some(first) if first.marker() == APP0 => 1,
                _ => 0,
            };
            segments.insert(pos, segment);
        }
    }

    Ok(())
}

/// Write `bytes` to `dest` through a temporary file in the same directory, so a failed
/// write never leaves a partial file behind.
pub fn write_atomically(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
