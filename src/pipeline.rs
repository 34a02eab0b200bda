use chrono::NaiveDate;
use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{CollisionPolicy, OutputConfig};
use crate::date::DateTaken;
use crate::error::{ArchiveError, BatchError, FileError};
use crate::exif;
use crate::gps::{GeoCoordinate, GpsRational};
use crate::report::{ArchiveFailure, ArchiveSummary, BatchReport, FileOutcome};

/// Extensions picked up from the source directory, compared case-insensitively.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// How many `name (n).jpg` candidates [`CollisionPolicy::Rename`] tries before giving up.
const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// What to tag and where to put it.
///
/// # Example
///
/// ```rust,no_run
/// use chrono::NaiveDate;
/// use exif_tagger::gps::GeoCoordinate;
/// use exif_tagger::pipeline::{BatchJob, BatchOptions, run_batch};
///
/// let job = BatchJob {
///     source_dir: "./import".into(),
///     dest_dir: "./albums/Paris".into(),
///     date: NaiveDate::from_ymd_opt(2019, 7, 14).unwrap(),
///     coordinate: Some(GeoCoordinate::new(48.8566, 2.3522)),
///     archive_dir: Some("./archive".into()),
/// };
///
/// let report = run_batch(&job, &BatchOptions::default()).unwrap();
/// println!("{} tagged, {} failed", report.processed_count, report.error_count);
/// ```
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Capture date written to every file, at midnight.
    pub date: NaiveDate,
    /// Location written to every file. The existing GPS data is kept when `None`.
    pub coordinate: Option<GeoCoordinate>,
    /// Originals are moved here after a successful tag. Nothing is moved when `None`.
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    pub collision: CollisionPolicy,
    pub dry_run: bool,
}

impl From<&OutputConfig> for BatchOptions {
    fn from(output: &OutputConfig) -> Self {
        Self {
            collision: output.collision,
            dry_run: output.dry_run,
        }
    }
}

/// Reported after each file has been handled.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based position of the file in the batch.
    pub index: usize,
    pub total: usize,
    pub file_name: &'a str,
}

/// List the JPEG files directly inside `dir`, sorted by file name.
///
/// Sub-directories are not descended into, and files with other extensions are ignored.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut images = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BatchError::SourceUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let p = entry.path();
        if p.is_file() && is_jpeg(p) {
            images.push(p.to_path_buf());
        }
    }

    Ok(images)
}

/// Check if a file has a JPEG extension.
fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Tag every JPEG in the source directory. See [`run_batch_with_progress`].
pub fn run_batch(job: &BatchJob, options: &BatchOptions) -> Result<BatchReport, BatchError> {
    run_batch_with_progress(job, options, |_| {})
}

/// Tag every JPEG in the source directory and write the results to the destination.
///
/// 1. **Validate**: directories, date and coordinate are checked before anything is read
/// 2. **Tag**: each file gets the new capture date (and location), every other tag is kept
/// 3. **Archive**: originals of successfully tagged files are moved to the archive directory
///
/// A file that fails is recorded in the report and the batch carries on. Only a
/// precondition failure is returned as an error. `on_progress` is called after each file.
pub fn run_batch_with_progress<F>(
    job: &BatchJob,
    options: &BatchOptions,
    mut on_progress: F,
) -> Result<BatchReport, BatchError>
where
    F: FnMut(Progress<'_>),
{
    let date = validate(job)?;
    let images = collect_images(&job.source_dir)?;

    if images.is_empty() {
        log::info!("No JPEG files found in {}", job.source_dir.display());
        return Ok(BatchReport::nothing_to_do(options.dry_run));
    }

    let gps = job.coordinate.as_ref().map(GeoCoordinate::to_gps_rational);
    let total = images.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut tagged = Vec::new();

    for (i, path) in images.iter().enumerate() {
        let file_name = file_name_of(path);
        log::info!("[{}/{}] {}", i + 1, total, file_name);

        match tag_file(path, &file_name, job, &date, gps.as_ref(), options) {
            Ok(dest) => {
                if options.dry_run {
                    log::info!("  Dry run: would write {}", dest.display());
                } else {
                    log::debug!("  Written to {}", dest.display());
                }
                outcomes.push(FileOutcome::success(file_name.clone()));
                tagged.push(path.as_path());
            }
            Err(e) => {
                log::error!("  {file_name}: {e}");
                outcomes.push(FileOutcome::failed(file_name.clone(), e.to_string()));
            }
        }

        on_progress(Progress {
            index: i + 1,
            total,
            file_name: &file_name,
        });
    }

    let archive = match &job.archive_dir {
        Some(_) if options.dry_run => {
            log::info!("Dry run: {} originals would be archived", tagged.len());
            Some(ArchiveSummary::default())
        }
        Some(archive_dir) => Some(archive_originals(&tagged, archive_dir)),
        None => None,
    };

    let report = BatchReport::completed(outcomes, archive, options.dry_run);
    log::info!(
        "Done: {} tagged, {} failed{}",
        report.processed_count,
        report.error_count,
        report
            .archived_count
            .map(|n| format!(", {n} archived"))
            .unwrap_or_default()
    );
    Ok(report)
}

/// Check every precondition and derive the timestamp to write.
fn validate(job: &BatchJob) -> Result<DateTaken, BatchError> {
    if !job.source_dir.is_dir() {
        return Err(BatchError::SourceDirMissing(job.source_dir.clone()));
    }
    if !job.dest_dir.is_dir() {
        return Err(BatchError::DestDirMissing(job.dest_dir.clone()));
    }

    let source = canonical(&job.source_dir);
    let dest = canonical(&job.dest_dir);
    if source == dest {
        return Err(BatchError::DestIsSource(job.dest_dir.clone()));
    }

    if let Some(archive_dir) = &job.archive_dir {
        if !archive_dir.is_dir() {
            return Err(BatchError::ArchiveDirMissing(archive_dir.clone()));
        }
        let archive = canonical(archive_dir);
        if archive == source || archive == dest {
            return Err(BatchError::ArchiveOverlaps(archive_dir.clone()));
        }
    }

    if let Some(coordinate) = &job.coordinate {
        coordinate.validate()?;
    }

    DateTaken::from_date(job.date)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Tag one file and write it to the destination. Returns the path written (or that would
/// have been written on a dry run).
fn tag_file(
    path: &Path,
    file_name: &str,
    job: &BatchJob,
    date: &DateTaken,
    gps: Option<&GpsRational>,
    options: &BatchOptions,
) -> Result<PathBuf, FileError> {
    let output = tag_image(path, date, gps)?;
    let dest = resolve_destination(&job.dest_dir, file_name, options.collision)?;

    if !options.dry_run {
        exif::write_atomically(&dest, &output).map_err(FileError::Write)?;
    }
    Ok(dest)
}

/// Read a JPEG, merge the new date and location into its EXIF, and return the new file bytes.
pub fn tag_image(
    path: &Path,
    date: &DateTaken,
    gps: Option<&GpsRational>,
) -> Result<Vec<u8>, FileError> {
    let file_bytes = fs::read(path).map_err(FileError::Read)?;
    let mut jpeg =
        Jpeg::from_bytes(Bytes::from(file_bytes)).map_err(|e| FileError::NotJpeg(e.to_string()))?;

    let mut container = exif::read_container(&jpeg);

    let repaired = exif::repair_byte_tags(&mut container)?;
    if repaired > 0 {
        log::info!("  Repaired {repaired} malformed tag(s)");
    }

    exif::apply_capture_date(&mut container, date);
    if let Some(gps) = gps {
        exif::apply_location(&mut container, gps);
    }

    exif::embed_container(&mut jpeg, &container)?;
    Ok(jpeg.encoder().bytes().to_vec())
}

/// Pick the path a tagged file is written to.
fn resolve_destination(
    dest_dir: &Path,
    file_name: &str,
    policy: CollisionPolicy,
) -> Result<PathBuf, FileError> {
    let dest = dest_dir.join(file_name);
    if !dest.exists() {
        return Ok(dest);
    }

    match policy {
        CollisionPolicy::Overwrite => {
            log::debug!("  Overwriting {}", dest.display());
            Ok(dest)
        }
        CollisionPolicy::Skip => Err(FileError::DestinationExists(dest)),
        CollisionPolicy::Rename => {
            let name = Path::new(file_name);
            let stem = name
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = name
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();

            for n in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = dest_dir.join(format!("{stem} ({n}){ext}"));
                if !candidate.exists() {
                    log::debug!("  {} exists, writing {}", file_name, candidate.display());
                    return Ok(candidate);
                }
            }
            Err(FileError::DestinationExists(dest))
        }
    }
}

/// Move each original into the archive directory.
///
/// A failed move is recorded and the pass carries on with the next file.
fn archive_originals(originals: &[&Path], archive_dir: &Path) -> ArchiveSummary {
    let mut summary = ArchiveSummary::default();

    for &path in originals {
        let file_name = file_name_of(path);
        match archive_one(path, &archive_dir.join(&file_name)) {
            Ok(()) => {
                log::debug!("  Archived {file_name}");
                summary.archived.push(file_name);
            }
            Err(e) => {
                log::warn!("  Failed to archive {file_name}: {e}");
                summary.failures.push(ArchiveFailure {
                    file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    summary
}

fn archive_one(src: &Path, target: &Path) -> Result<(), ArchiveError> {
    if target.exists() {
        return Err(ArchiveError::TargetExists(target.to_path_buf()));
    }
    move_file(src, target)
}

/// Rename, or copy then remove when the rename fails (e.g. across filesystems).
fn move_file(src: &Path, dst: &Path) -> Result<(), ArchiveError> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    if let Err(e) = fs::copy(src, dst) {
        let _ = fs::remove_file(dst);
        return Err(ArchiveError::Move(e));
    }
    if let Err(e) = fs::remove_file(src) {
        let _ = fs::remove_file(dst);
        return Err(ArchiveError::Move(e));
    }
    Ok(())
}
