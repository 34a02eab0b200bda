use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A batch that cannot start. This is the only error [`run_batch`](crate::pipeline::run_batch)
/// returns; everything that happens to an individual file ends up in the report instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("source directory does not exist or is not a directory: {}", .0.display())]
    SourceDirMissing(PathBuf),

    #[error("destination directory does not exist or is not a directory: {}", .0.display())]
    DestDirMissing(PathBuf),

    #[error("archive directory does not exist or is not a directory: {}", .0.display())]
    ArchiveDirMissing(PathBuf),

    #[error("destination directory must differ from the source directory: {}", .0.display())]
    DestIsSource(PathBuf),

    #[error("archive directory must differ from the source and destination directories: {}", .0.display())]
    ArchiveOverlaps(PathBuf),

    #[error("date year {0} cannot be written as an EXIF timestamp (expected 1..=9999)")]
    InvalidDate(i32),

    #[error("coordinate ({latitude}, {longitude}) is outside latitude [-90, 90] / longitude [-180, 180]")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("failed to list source directory {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// The embedded TIFF structure could not be parsed.
///
/// The engine never surfaces this as a file failure: the container is swapped for an
/// empty one and processing carries on.
#[derive(Debug, Error, PartialEq)]
pub enum ContainerError {
    #[error("TIFF data too short ({0} bytes)")]
    TooShort(usize),

    #[error("invalid TIFF byte order marker {0:02x?}")]
    BadByteOrder([u8; 2]),

    #[error("invalid TIFF magic number {0}")]
    BadMagic(u16),

    #[error("{what} at offset {offset} extends beyond TIFF data")]
    OutOfBounds { what: &'static str, offset: usize },

    #[error("IFD offset {0} visited twice")]
    OffsetLoop(usize),
}

/// Failures while turning a container back into bytes.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("encoded EXIF is {0} bytes, more than one APP1 segment can hold")]
    TooLarge(usize),

    #[error("{name} value {value} does not fit in a single byte")]
    ByteTagOverflow { name: &'static str, value: i64 },
}

/// Why a single file could not be tagged.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read source file: {0}")]
    Read(#[source] io::Error),

    #[error("not a readable JPEG image: {0}")]
    NotJpeg(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("failed to write destination file: {0}")]
    Write(#[source] io::Error),
}

/// Why a tagged original could not be moved into the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive already holds {}", .0.display())]
    TargetExists(PathBuf),

    #[error("failed to move original: {0}")]
    Move(#[source] io::Error),
}
