//! # exif-tagger
//!
//! Batch EXIF tagger for JPEG photos: stamp a capture date (and optionally a GPS location)
//! on every JPEG in a folder, write the tagged copies into an album folder, and optionally
//! move the originals into an archive.
//!
//! Only DateTimeOriginal, DateTimeDigitized and the GPS section are changed. Every other
//! tag, the thumbnail and the image data are carried over as they were.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use exif_tagger::config::Config;
//! use exif_tagger::gps::GeoCoordinate;
//! use exif_tagger::pipeline::{BatchJob, BatchOptions, run_batch};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     let job = BatchJob {
//!         source_dir: "./import".into(),
//!         dest_dir: config.album_path("Paris 2019").unwrap_or_else(|| "./out".into()),
//!         date: NaiveDate::from_ymd_opt(2019, 7, 14).unwrap(),
//!         coordinate: Some(GeoCoordinate::new(48.8566, 2.3522)),
//!         archive_dir: config.archive_dir.clone(),
//!     };
//!
//!     let report = run_batch(&job, &BatchOptions::from(&config.output))?;
//!     for (file, reason) in report.errors() {
//!         eprintln!("{file}: {reason}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use exif_tagger::exif::{self, tag, TagValue};
//! use img_parts::{Bytes, jpeg::Jpeg};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read("photo.jpg")?))?;
//! let mut container = exif::read_container(&jpeg);
//! container.image.insert(tag::MODEL, TagValue::ascii("Pinhole"));
//! exif::embed_container(&mut jpeg, &container)?;
//! exif::write_atomically("photo.jpg".as_ref(), &jpeg.encoder().bytes())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: Batch engine: file discovery, tagging, collisions, archiving
//! - [`exif`]: EXIF container, TIFF codec, JPEG segment handling
//! - [`gps`]: Decimal degrees to GPS rationals
//! - [`date`]: EXIF capture timestamps
//! - [`report`]: Per-file outcomes and batch summary
//! - [`config`]: Configuration types and loading/saving
//! - [`error`]: Error types

pub mod config;
pub mod date;
pub mod error;
pub mod exif;
pub mod gps;
pub mod pipeline;
pub mod report;
