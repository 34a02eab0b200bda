use std::collections::BTreeMap;

/// EXIF tag ids used by the tagger.
pub mod tag {
    // Structural pointers, regenerated on every encode
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;
    pub const INTEROP_IFD_POINTER: u16 = 0xA005;
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

    // IFD0 / IFD1
    pub const COMPRESSION: u16 = 0x0103;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const DATE_TIME: u16 = 0x0132;

    // Exif IFD
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
    pub const MAKER_NOTE: u16 = 0x927C;
    pub const FILE_SOURCE: u16 = 0xA300;
    pub const SCENE_TYPE: u16 = 0xA301;

    // Interop IFD
    pub const INTEROP_INDEX: u16 = 0x0001;

    // GPS IFD
    pub const GPS_VERSION_ID: u16 = 0x0000;
    pub const GPS_LATITUDE_REF: u16 = 0x0001;
    pub const GPS_LATITUDE: u16 = 0x0002;
    pub const GPS_LONGITUDE_REF: u16 = 0x0003;
    pub const GPS_LONGITUDE: u16 = 0x0004;
    pub const GPS_ALTITUDE: u16 = 0x0006;
}

/// Byte order of the TIFF structure inside the APP1 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II`
    Little,
    /// `MM`
    Big,
}

impl ByteOrder {
    pub(crate) fn marker(self) -> [u8; 2] {
        match self {
            Self::Little => *b"II",
            Self::Big => *b"MM",
        }
    }

    pub(crate) fn read_u16(self, b: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(b),
            Self::Big => u16::from_be_bytes(b),
        }
    }

    pub(crate) fn read_u32(self, b: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(b),
            Self::Big => u32::from_be_bytes(b),
        }
    }

    pub(crate) fn read_u64(self, b: [u8; 8]) -> u64 {
        match self {
            Self::Little => u64::from_le_bytes(b),
            Self::Big => u64::from_be_bytes(b),
        }
    }

    pub(crate) fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }

    pub(crate) fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }

    pub(crate) fn u64_bytes(self, v: u64) -> [u8; 8] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }
}

/// A decoded TIFF field value, one variant per TIFF data format.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    /// Raw ASCII bytes including the NUL terminator(s).
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// An ASCII value with the NUL terminator EXIF expects.
    pub fn ascii(s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    /// The text of an ASCII value, without trailing NULs.
    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            Self::Ascii(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(|s| s.trim_end_matches('\0')),
            _ => None,
        }
    }

    /// TIFF data format code.
    pub fn format(&self) -> u16 {
        match self {
            Self::Byte(_) => 1,
            Self::Ascii(_) => 2,
            Self::Short(_) => 3,
            Self::Long(_) => 4,
            Self::Rational(_) => 5,
            Self::SByte(_) => 6,
            Self::Undefined(_) => 7,
            Self::SShort(_) => 8,
            Self::SLong(_) => 9,
            Self::SRational(_) => 10,
            Self::Float(_) => 11,
            Self::Double(_) => 12,
        }
    }

    /// Number of components.
    pub fn count(&self) -> usize {
        match self {
            Self::Byte(v) | Self::Ascii(v) | Self::Undefined(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Rational(v) => v.len(),
            Self::SByte(v) => v.len(),
            Self::SShort(v) => v.len(),
            Self::SLong(v) => v.len(),
            Self::SRational(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.count() * component_size(self.format()).unwrap_or(1)
    }

    /// The value of an integer field holding exactly one component.
    pub fn single_integer(&self) -> Option<i64> {
        match self {
            Self::Byte(v) if v.len() == 1 => Some(i64::from(v[0])),
            Self::Short(v) if v.len() == 1 => Some(i64::from(v[0])),
            Self::Long(v) if v.len() == 1 => Some(i64::from(v[0])),
            Self::SByte(v) if v.len() == 1 => Some(i64::from(v[0])),
            Self::SShort(v) if v.len() == 1 => Some(i64::from(v[0])),
            Self::SLong(v) if v.len() == 1 => Some(i64::from(v[0])),
            _ => None,
        }
    }
}

/// Size of one component of the given TIFF data format, `None` for unknown formats.
///
/// Format 13 (IFD) is a 4-byte offset, read back as a LONG.
pub(crate) fn component_size(format: u16) -> Option<usize> {
    match format {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// One IFD worth of tags, kept in ascending tag order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    entries: BTreeMap<u16, TagValue>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    pub fn insert(&mut self, tag: u16, value: TagValue) -> Option<TagValue> {
        self.entries.insert(tag, value)
    }

    pub fn remove(&mut self, tag: u16) -> Option<TagValue> {
        self.entries.remove(&tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.entries.iter().map(|(tag, value)| (*tag, value))
    }
}

impl FromIterator<(u16, TagValue)> for Section {
    fn from_iter<I: IntoIterator<Item = (u16, TagValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The four named sections of an EXIF container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// IFD0: camera and file-level tags.
    Image,
    /// Exif sub-IFD: capture tags such as DateTimeOriginal.
    Photo,
    /// GPS sub-IFD.
    Gps,
    /// IFD1: tags describing the embedded thumbnail.
    Thumbnail,
}

/// Parsed EXIF metadata of one image.
///
/// Pointer tags (Exif/GPS/Interop IFD offsets and the thumbnail offset/length) never
/// live in the sections: they are consumed by the decoder and regenerated by the encoder.
/// The Interoperability IFD and the thumbnail bytes ride along so nothing is lost when the
/// container is written back.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataContainer {
    pub byte_order: ByteOrder,
    pub image: Section,
    pub photo: Section,
    pub gps: Section,
    pub thumbnail: Section,
    pub interop: Section,
    pub thumbnail_data: Option<Vec<u8>>,
}

impl Default for MetadataContainer {
    fn default() -> Self {
        Self::empty()
    }
}

impl MetadataContainer {
    /// Four empty sections, big-endian.
    pub fn empty() -> Self {
        Self {
            byte_order: ByteOrder::Big,
            image: Section::new(),
            photo: Section::new(),
            gps: Section::new(),
            thumbnail: Section::new(),
            interop: Section::new(),
            thumbnail_data: None,
        }
    }

    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Image => &self.image,
            SectionKind::Photo => &self.photo,
            SectionKind::Gps => &self.gps,
            SectionKind::Thumbnail => &self.thumbnail,
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::Image => &mut self.image,
            SectionKind::Photo => &mut self.photo,
            SectionKind::Gps => &mut self.gps,
            SectionKind::Thumbnail => &mut self.thumbnail,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
            && self.photo.is_empty()
            && self.gps.is_empty()
            && self.thumbnail.is_empty()
            && self.interop.is_empty()
            && self.thumbnail_data.is_none()
    }

    /// DateTimeOriginal as text, if present.
    pub fn date_time_original(&self) -> Option<&str> {
        self.photo
            .get(tag::DATE_TIME_ORIGINAL)
            .and_then(TagValue::as_ascii)
    }
}
