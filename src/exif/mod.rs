//! EXIF metadata inside JPEG files.
//!
//! - [`container`] holds the typed tag sections and the TIFF tag ids used by this crate
//! - [`decode`] and [`encode`] convert between a container and the TIFF bytes of an APP1 segment
//! - [`read_container`] and [`embed_container`] move a container in and out of a [`Jpeg`](img_parts::jpeg::Jpeg)
//! - [`read_capture_info`] summarises a file for display, using nom-exif

mod container;
mod reader;
mod repair;
mod tiff;
mod writer;

pub use container::{ByteOrder, MetadataContainer, Section, SectionKind, TagValue, tag};
pub use reader::{CaptureInfo, read_capture_info};
pub use repair::repair_byte_tags;
pub use tiff::{decode, encode};
pub use writer::{apply_capture_date, apply_location, embed_container, read_container, write_atomically};
