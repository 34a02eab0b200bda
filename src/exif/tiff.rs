//! TIFF structure codec for the payload of a JPEG `Exif\0\0` APP1 segment.
//!
//! Decoding walks IFD0, its Exif/GPS sub-IFDs, the Interop IFD hanging off the Exif IFD,
//! and IFD1 with its thumbnail. Encoding lays the same IFDs out again in that order, each
//! followed by its out-of-line values, with the thumbnail bytes last.

use super::container::{ByteOrder, MetadataContainer, Section, TagValue, component_size, tag};
use crate::error::ContainerError;

const TIFF_MAGIC: u16 = 42;
const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;

/// Decode a TIFF structure into a container.
pub fn decode(data: &[u8]) -> Result<MetadataContainer, ContainerError> {
    if data.len() < HEADER_LEN {
        return Err(ContainerError::TooShort(data.len()));
    }

    let byte_order = match [data[0], data[1]] {
        [b'I', b'I'] => ByteOrder::Little,
        [b'M', b'M'] => ByteOrder::Big,
        other => return Err(ContainerError::BadByteOrder(other)),
    };

    let reader = Reader {
        data,
        order: byte_order,
        visited: Vec::new(),
    };
    reader.decode()
}

struct Reader<'a> {
    data: &'a [u8],
    order: ByteOrder,
    visited: Vec<usize>,
}

impl Reader<'_> {
    fn decode(mut self) -> Result<MetadataContainer, ContainerError> {
        let magic = self.u16(2, "TIFF magic")?;
        if magic != TIFF_MAGIC {
            return Err(ContainerError::BadMagic(magic));
        }

        let ifd0_offset = self.u32(4, "IFD0 offset")? as usize;
        let (mut image, ifd1_offset) = self.read_ifd(ifd0_offset)?;

        let mut photo = match take_pointer(&mut image, tag::EXIF_IFD_POINTER) {
            Some(offset) => self.read_ifd(offset)?.0,
            None => Section::new(),
        };

        let interop = match take_pointer(&mut photo, tag::INTEROP_IFD_POINTER) {
            Some(offset) => self.read_ifd(offset)?.0,
            None => Section::new(),
        };

        let gps = match take_pointer(&mut image, tag::GPS_IFD_POINTER) {
            Some(offset) => self.read_ifd(offset)?.0,
            None => Section::new(),
        };

        let (thumbnail, thumbnail_data) = if ifd1_offset == 0 {
            (Section::new(), None)
        } else {
            match self.read_ifd(ifd1_offset as usize) {
                Ok((mut thumbnail, _)) => {
                    let data = self.take_thumbnail(&mut thumbnail);
                    (thumbnail, data)
                }
                Err(e) => {
                    log::warn!("Dropping unreadable thumbnail IFD: {e}");
                    (Section::new(), None)
                }
            }
        };

        Ok(MetadataContainer {
            byte_order: self.order,
            image,
            photo,
            gps,
            thumbnail,
            interop,
            thumbnail_data,
        })
    }

    fn slice(&self, offset: usize, len: usize, what: &'static str) -> Result<&[u8], ContainerError> {
        offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or(ContainerError::OutOfBounds { what, offset })
    }

    fn u16(&self, offset: usize, what: &'static str) -> Result<u16, ContainerError> {
        let b = self.slice(offset, 2, what)?;
        Ok(self.order.read_u16([b[0], b[1]]))
    }

    fn u32(&self, offset: usize, what: &'static str) -> Result<u32, ContainerError> {
        let b = self.slice(offset, 4, what)?;
        Ok(self.order.read_u32([b[0], b[1], b[2], b[3]]))
    }

    /// Read one IFD, returning its tags and the offset of the next IFD.
    ///
    /// Entries with an unknown format or a value outside the data are skipped; a broken
    /// entry table fails the whole IFD. A next-IFD offset cut off by the end of the data
    /// reads as 0, since sub-IFDs at the tail of a file often omit it.
    fn read_ifd(&mut self, offset: usize) -> Result<(Section, u32), ContainerError> {
        if self.visited.contains(&offset) {
            return Err(ContainerError::OffsetLoop(offset));
        }
        self.visited.push(offset);

        let count = self.u16(offset, "IFD entry count")? as usize;
        let entries_start = offset + 2;
        self.slice(entries_start, count * ENTRY_LEN, "IFD entry table")?;

        let mut section = Section::new();
        for i in 0..count {
            let entry = entries_start + i * ENTRY_LEN;
            let tag_id = self.u16(entry, "IFD entry")?;
            let format = self.u16(entry + 2, "IFD entry")?;
            let components = self.u32(entry + 4, "IFD entry")? as usize;

            let Some(size) = component_size(format) else {
                log::debug!("Skipping tag 0x{tag_id:04X} with unknown format {format}");
                continue;
            };
            let Some(len) = components.checked_mul(size) else {
                log::warn!("Skipping tag 0x{tag_id:04X}: component count {components} overflows");
                continue;
            };

            let raw = if len <= 4 {
                self.slice(entry + 8, len, "inline value")
            } else {
                let value_offset = self.u32(entry + 8, "value offset")? as usize;
                self.slice(value_offset, len, "tag value")
            };

            match raw {
                Ok(raw) => {
                    section.insert(tag_id, decode_value(format, raw, self.order));
                }
                Err(e) => log::warn!("Skipping tag 0x{tag_id:04X}: {e}"),
            }
        }

        let next = match self.u32(entries_start + count * ENTRY_LEN, "next IFD offset") {
            Ok(next) => next,
            Err(e) => {
                log::debug!("IFD at {offset} has no next offset: {e}");
                0
            }
        };
        Ok((section, next))
    }

    /// Pull the JPEG thumbnail referenced by IFD1 out of the data.
    fn take_thumbnail(&self, thumbnail: &mut Section) -> Option<Vec<u8>> {
        let offset = take_pointer(thumbnail, tag::JPEG_INTERCHANGE_FORMAT);
        let length = take_pointer(thumbnail, tag::JPEG_INTERCHANGE_FORMAT_LENGTH);
        match (offset, length) {
            (Some(offset), Some(length)) => match self.slice(offset, length, "thumbnail") {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(e) => {
                    log::warn!("Dropping thumbnail: {e}");
                    None
                }
            },
            _ => None,
        }
    }
}

/// Remove a pointer-style tag and return the offset it holds.
fn take_pointer(section: &mut Section, tag_id: u16) -> Option<usize> {
    let value = section.remove(tag_id)?;
    match value.single_integer() {
        Some(offset) if offset >= 0 => Some(offset as usize),
        _ => {
            log::warn!("Ignoring malformed pointer tag 0x{tag_id:04X}: {value:?}");
            None
        }
    }
}

fn decode_value(format: u16, raw: &[u8], order: ByteOrder) -> TagValue {
    let u16s = || raw.chunks_exact(2).map(|c| order.read_u16([c[0], c[1]]));
    let u32s = || {
        raw.chunks_exact(4)
            .map(|c| order.read_u32([c[0], c[1], c[2], c[3]]))
    };
    let u32_pairs = || {
        raw.chunks_exact(8).map(|c| {
            (
                order.read_u32([c[0], c[1], c[2], c[3]]),
                order.read_u32([c[4], c[5], c[6], c[7]]),
            )
        })
    };

    match format {
        1 => TagValue::Byte(raw.to_vec()),
        2 => TagValue::Ascii(raw.to_vec()),
        3 => TagValue::Short(u16s().collect()),
        // IFD (13) is an offset, kept as a plain LONG
        4 | 13 => TagValue::Long(u32s().collect()),
        5 => TagValue::Rational(u32_pairs().collect()),
        6 => TagValue::SByte(raw.iter().map(|&b| b as i8).collect()),
        8 => TagValue::SShort(u16s().map(|v| v as i16).collect()),
        9 => TagValue::SLong(u32s().map(|v| v as i32).collect()),
        10 => TagValue::SRational(u32_pairs().map(|(n, d)| (n as i32, d as i32)).collect()),
        11 => TagValue::Float(u32s().map(f32::from_bits).collect()),
        12 => TagValue::Double(
            raw.chunks_exact(8)
                .map(|c| f64::from_bits(order.read_u64([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])))
                .collect(),
        ),
        // 7 and anything component_size() lets through
        _ => TagValue::Undefined(raw.to_vec()),
    }
}

fn encode_value(value: &TagValue, order: ByteOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.byte_len());
    match value {
        TagValue::Byte(v) | TagValue::Ascii(v) | TagValue::Undefined(v) => out.extend_from_slice(v),
        TagValue::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
        TagValue::Short(v) => v.iter().for_each(|&x| out.extend_from_slice(&order.u16_bytes(x))),
        TagValue::SShort(v) => v
            .iter()
            .for_each(|&x| out.extend_from_slice(&order.u16_bytes(x as u16))),
        TagValue::Long(v) => v.iter().for_each(|&x| out.extend_from_slice(&order.u32_bytes(x))),
        TagValue::SLong(v) => v
            .iter()
            .for_each(|&x| out.extend_from_slice(&order.u32_bytes(x as u32))),
        TagValue::Rational(v) => v.iter().for_each(|&(n, d)| {
            out.extend_from_slice(&order.u32_bytes(n));
            out.extend_from_slice(&order.u32_bytes(d));
        }),
        TagValue::SRational(v) => v.iter().for_each(|&(n, d)| {
            out.extend_from_slice(&order.u32_bytes(n as u32));
            out.extend_from_slice(&order.u32_bytes(d as u32));
        }),
        TagValue::Float(v) => v
            .iter()
            .for_each(|&x| out.extend_from_slice(&order.u32_bytes(x.to_bits()))),
        TagValue::Double(v) => v
            .iter()
            .for_each(|&x| out.extend_from_slice(&order.u64_bytes(x.to_bits()))),
    }
    out
}

/// Out-of-line values start on a word boundary.
fn padded(len: usize) -> usize {
    len + (len & 1)
}

/// Bytes an IFD occupies including its out-of-line values.
fn ifd_len(section: &Section) -> usize {
    let values: usize = section
        .iter()
        .map(|(_, v)| v.byte_len())
        .filter(|&len| len > 4)
        .map(padded)
        .sum();
    2 + section.len() * ENTRY_LEN + 4 + values
}

fn pointer(offset: usize) -> TagValue {
    TagValue::Long(vec![offset as u32])
}

/// Encode a container as a TIFF structure in the container's byte order.
pub fn encode(container: &MetadataContainer) -> Vec<u8> {
    let order = container.byte_order;

    let mut image = container.image.clone();
    let mut photo = container.photo.clone();
    let mut thumbnail = container.thumbnail.clone();
    for tag_id in [tag::EXIF_IFD_POINTER, tag::GPS_IFD_POINTER] {
        image.remove(tag_id);
    }
    photo.remove(tag::INTEROP_IFD_POINTER);
    thumbnail.remove(tag::JPEG_INTERCHANGE_FORMAT);
    thumbnail.remove(tag::JPEG_INTERCHANGE_FORMAT_LENGTH);

    let has_interop = !container.interop.is_empty();
    let has_photo = !photo.is_empty() || has_interop;
    let has_gps = !container.gps.is_empty();
    let has_thumbnail = !thumbnail.is_empty() || container.thumbnail_data.is_some();

    // Pointers are fixed-size LONGs, so placeholders give final IFD sizes up front.
    if has_photo {
        image.insert(tag::EXIF_IFD_POINTER, pointer(0));
    }
    if has_gps {
        image.insert(tag::GPS_IFD_POINTER, pointer(0));
    }
    if has_interop {
        photo.insert(tag::INTEROP_IFD_POINTER, pointer(0));
    }
    if let Some(data) = &container.thumbnail_data {
        thumbnail.insert(tag::JPEG_INTERCHANGE_FORMAT, pointer(0));
        thumbnail.insert(tag::JPEG_INTERCHANGE_FORMAT_LENGTH, pointer(data.len()));
    }

    let mut cursor = HEADER_LEN + ifd_len(&image);
    let mut place = |present: bool, section: &Section| -> Option<usize> {
        if !present {
            return None;
        }
        let at = cursor;
        cursor += ifd_len(section);
        Some(at)
    };
    let exif_offset = place(has_photo, &photo);
    let interop_offset = place(has_interop, &container.interop);
    let gps_offset = place(has_gps, &container.gps);
    let ifd1_offset = place(has_thumbnail, &thumbnail);
    let thumbnail_offset = cursor;

    if let Some(offset) = exif_offset {
        image.insert(tag::EXIF_IFD_POINTER, pointer(offset));
    }
    if let Some(offset) = gps_offset {
        image.insert(tag::GPS_IFD_POINTER, pointer(offset));
    }
    if let Some(offset) = interop_offset {
        photo.insert(tag::INTEROP_IFD_POINTER, pointer(offset));
    }
    if container.thumbnail_data.is_some() {
        thumbnail.insert(tag::JPEG_INTERCHANGE_FORMAT, pointer(thumbnail_offset));
    }

    let thumbnail_len = container.thumbnail_data.as_ref().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(thumbnail_offset + thumbnail_len);
    out.extend_from_slice(&order.marker());
    out.extend_from_slice(&order.u16_bytes(TIFF_MAGIC));
    out.extend_from_slice(&order.u32_bytes(HEADER_LEN as u32));

    write_ifd(&mut out, &image, order, ifd1_offset.unwrap_or(0));
    if has_photo {
        write_ifd(&mut out, &photo, order, 0);
    }
    if has_interop {
        write_ifd(&mut out, &container.interop, order, 0);
    }
    if has_gps {
        write_ifd(&mut out, &container.gps, order, 0);
    }
    if has_thumbnail {
        write_ifd(&mut out, &thumbnail, order, 0);
    }
    if let Some(data) = &container.thumbnail_data {
        out.extend_from_slice(data);
    }

    debug_assert_eq!(out.len(), thumbnail_offset + thumbnail_len);
    out
}

/// Append one IFD at the end of `out`, followed by its out-of-line values.
fn write_ifd(out: &mut Vec<u8>, section: &Section, order: ByteOrder, next: usize) {
    let start = out.len();
    let mut value_offset = start + 2 + section.len() * ENTRY_LEN + 4;
    let mut values = Vec::new();

    out.extend_from_slice(&order.u16_bytes(section.len() as u16));
    for (tag_id, value) in section.iter() {
        let bytes = encode_value(value, order);
        out.extend_from_slice(&order.u16_bytes(tag_id));
        out.extend_from_slice(&order.u16_bytes(value.format()));
        out.extend_from_slice(&order.u32_bytes(value.count() as u32));

        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&order.u32_bytes(value_offset as u32));
            value_offset += padded(bytes.len());
            values.extend_from_slice(&bytes);
            if bytes.len() % 2 == 1 {
                values.push(0);
            }
        }
    }
    out.extend_from_slice(&order.u32_bytes(next as u32));
    out.extend_from_slice(&values);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with IFD0 { Make = "Canon", ExifIFD -> { ExposureTime = 1/250 } }.
    fn handmade_little_endian_tiff() -> Vec<u8> {
        let mut t = Vec::new();
        t.extend_from_slice(b"II");
        t.extend_from_slice(&42u16.to_le_bytes());
        t.extend_from_slice(&8u32.to_le_bytes());
        // IFD0 at 8: 2 entries -> ends at 8 + 2 + 24 + 4 = 38
        t.extend_from_slice(&2u16.to_le_bytes());
        // Make, ASCII, 6, offset 38
        t.extend_from_slice(&0x010Fu16.to_le_bytes());
        t.extend_from_slice(&2u16.to_le_bytes());
        t.extend_from_slice(&6u32.to_le_bytes());
        t.extend_from_slice(&38u32.to_le_bytes());
        // ExifIFD pointer, LONG, 1, 44
        t.extend_from_slice(&0x8769u16.to_le_bytes());
        t.extend_from_slice(&4u16.to_le_bytes());
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(&44u32.to_le_bytes());
        t.extend_from_slice(&0u32.to_le_bytes());
        t.extend_from_slice(b"Canon\0");
        // Exif IFD at 44: 1 entry -> ends at 44 + 2 + 12 + 4 = 62
        t.extend_from_slice(&1u16.to_le_bytes());
        t.extend_from_slice(&0x829Au16.to_le_bytes());
        t.extend_from_slice(&5u16.to_le_bytes());
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(&62u32.to_le_bytes());
        t.extend_from_slice(&0u32.to_le_bytes());
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(&250u32.to_le_bytes());
        t
    }

    fn sample_container() -> MetadataContainer {
        let mut container = MetadataContainer::empty();
        container.image.insert(tag::MAKE, TagValue::ascii("FUJIFILM"));
        container.image.insert(tag::ORIENTATION, TagValue::Short(vec![1]));
        container
            .photo
            .insert(tag::DATE_TIME_ORIGINAL, TagValue::ascii("1999:12:31 23:59:59"));
        container
            .photo
            .insert(tag::MAKER_NOTE, TagValue::Undefined(b"vendor blob!!".to_vec()));
        container
            .interop
            .insert(tag::INTEROP_INDEX, TagValue::ascii("R98"));
        container
            .gps
            .insert(tag::GPS_ALTITUDE, TagValue::Rational(vec![(1234, 10)]));
        container.thumbnail.insert(tag::COMPRESSION, TagValue::Short(vec![6]));
        container.thumbnail_data = Some(vec![0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        container
    }

    #[test]
    fn decodes_handmade_little_endian_structure() {
        let container = decode(&handmade_little_endian_tiff()).unwrap();
        assert_eq!(container.byte_order, ByteOrder::Little);
        assert_eq!(
            container.image.get(tag::MAKE).and_then(TagValue::as_ascii),
            Some("Canon")
        );
        assert!(!container.image.contains(tag::EXIF_IFD_POINTER));
        assert_eq!(
            container.photo.get(tag::EXPOSURE_TIME),
            Some(&TagValue::Rational(vec![(1, 250)]))
        );
        assert!(container.gps.is_empty());
        assert!(container.thumbnail.is_empty());
    }

    #[test]
    fn reencoding_in_source_byte_order_is_byte_identical() {
        let original = handmade_little_endian_tiff();
        let container = decode(&original).unwrap();
        assert_eq!(encode(&container), original);
    }

    #[test]
    fn all_sections_survive_encode_then_decode() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut container = sample_container();
            container.byte_order = order;
            let decoded = decode(&encode(&container)).unwrap();
            assert_eq!(decoded, container);
        }
    }

    #[test]
    fn no_gps_pointer_without_gps_tags() {
        let mut container = MetadataContainer::empty();
        container
            .photo
            .insert(tag::DATE_TIME_ORIGINAL, TagValue::ascii("2020:06:15 00:00:00"));
        let bytes = encode(&container);
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.gps.is_empty());
        assert!(decoded.image.is_empty());
        assert_eq!(decoded.photo, container.photo);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode(b"II*"), Err(ContainerError::TooShort(3)));
        assert_eq!(
            decode(b"XX\0\x2a\0\0\0\x08"),
            Err(ContainerError::BadByteOrder(*b"XX"))
        );
        assert_eq!(decode(b"MM\0\x2b\0\0\0\x08"), Err(ContainerError::BadMagic(43)));
        assert!(matches!(
            decode(b"MM\0\x2a\0\0\xff\xff"),
            Err(ContainerError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn detects_ifd_loops() {
        let mut t = handmade_little_endian_tiff();
        // Point the Exif IFD back at IFD0
        t[30..34].copy_from_slice(&8u32.to_le_bytes());
        assert_eq!(decode(&t), Err(ContainerError::OffsetLoop(8)));
    }

    #[test]
    fn skips_entry_with_out_of_bounds_value() {
        let mut t = handmade_little_endian_tiff();
        // Make's value offset far past the end
        t[18..22].copy_from_slice(&5000u32.to_le_bytes());
        let container = decode(&t).unwrap();
        assert!(!container.image.contains(tag::MAKE));
        assert!(container.photo.contains(tag::EXPOSURE_TIME));
    }

    #[test]
    fn exif_ifd_at_end_without_next_offset_keeps_tags() {
        let mut t = handmade_little_endian_tiff();
        // Replace the Exif IFD at 44 with { ISO = 100 } and stop right after its entry
        t.truncate(44);
        t.extend_from_slice(&1u16.to_le_bytes());
        t.extend_from_slice(&0x8827u16.to_le_bytes());
        t.extend_from_slice(&3u16.to_le_bytes());
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(&100u16.to_le_bytes());
        t.extend_from_slice(&[0, 0]);
        assert_eq!(t.len(), 58);

        let container = decode(&t).unwrap();
        assert_eq!(
            container.image.get(tag::MAKE).and_then(TagValue::as_ascii),
            Some("Canon")
        );
        assert_eq!(container.photo.get(0x8827), Some(&TagValue::Short(vec![100])));
        assert!(container.thumbnail.is_empty());
    }

    #[test]
    fn follows_exif_pointer_stored_as_ifd_type() {
        let mut t = handmade_little_endian_tiff();
        // ExifIFD entry is at 22; its format field follows the tag id
        t[24..26].copy_from_slice(&13u16.to_le_bytes());

        let container = decode(&t).unwrap();
        assert!(!container.image.contains(tag::EXIF_IFD_POINTER));
        assert_eq!(
            container.photo.get(tag::EXPOSURE_TIME),
            Some(&TagValue::Rational(vec![(1, 250)]))
        );
    }

    #[test]
    fn out_of_line_values_are_word_aligned() {
        let mut container = MetadataContainer::empty();
        container.image.insert(tag::MAKE, TagValue::ascii("Pentax"));
        container.image.insert(tag::MODEL, TagValue::ascii("K-1 II"));
        let bytes = encode(&container);
        // Make's 7 bytes sit at 38 and get one pad byte, so Model starts at 46
        let make_offset = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
        let model_offset = u32::from_be_bytes([bytes[30], bytes[31], bytes[32], bytes[33]]);
        assert_eq!(make_offset, 38);
        assert_eq!(model_offset, 46);
        assert_eq!(decode(&bytes).unwrap().image, container.image);
    }
}
