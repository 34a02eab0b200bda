use super::container::{MetadataContainer, TagValue, tag};
use crate::error::EncodeError;

/// Tags EXIF defines as a single UNDEFINED byte that some writers store as a plain integer.
const BYTE_TAGS: &[(u16, &str)] = &[(tag::SCENE_TYPE, "SceneType"), (tag::FILE_SOURCE, "FileSource")];

/// Normalise known malformed encodings in the photo section.
///
/// SceneType and FileSource held as a one-component integer (BYTE, SHORT, LONG or their
/// signed forms) are rewritten as a one-byte UNDEFINED value. A value outside 0..=255 has
/// no one-byte form and is an error. Returns how many tags were rewritten.
pub fn repair_byte_tags(container: &mut MetadataContainer) -> Result<usize, EncodeError> {
    let mut repaired = 0;

    for &(tag_id, name) in BYTE_TAGS {
        let Some(value) = container.photo.get(tag_id).and_then(TagValue::single_integer) else {
            continue;
        };
        let byte = u8::try_from(value).map_err(|_| EncodeError::ByteTagOverflow { name, value })?;

        log::debug!("  Repairing {name}: integer {value} -> 1 byte");
        container
            .photo
            .insert(tag_id, TagValue::Undefined(vec![byte]));
        repaired += 1;
    }

    Ok(repaired)
}
