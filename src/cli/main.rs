use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_tagger::config::{CollisionPolicy, Config};
use exif_tagger::date::DateTaken;
use exif_tagger::exif;
use exif_tagger::gps::GeoCoordinate;
use exif_tagger::pipeline::{self, BatchJob, BatchOptions, Progress};
use exif_tagger::report::{ArchiveState, BatchReport, BatchStatus};

/// How many failed file names the summary lists before eliding the rest.
const MAX_LISTED_ERRORS: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "exif-tagger",
    version,
    about = "Stamp a capture date and GPS location on a folder of JPEGs and file them into an album"
)]
struct Cli {
    /// Folder holding the JPEGs to tag
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Folder the tagged copies are written to
    #[arg(short, long, value_name = "DIR", conflicts_with = "album")]
    dest: Option<PathBuf>,

    /// Folder whose sub-folders are albums (overrides the config file)
    #[arg(long, value_name = "DIR")]
    albums_dir: Option<PathBuf>,

    /// Album to write into, a sub-folder of the albums folder
    #[arg(short, long, value_name = "NAME")]
    album: Option<String>,

    /// Capture date, YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Move originals here once tagged (overrides the config file)
    #[arg(long, value_name = "DIR")]
    archive: Option<PathBuf>,

    /// What to do when the destination already has a file of the same name
    #[arg(long, value_enum)]
    collision: Option<CollisionPolicy>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Preview changes without writing or moving any file
    #[arg(long)]
    dry_run: bool,

    /// Output the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the date, camera and location of every JPEG in the source folder and exit
    #[arg(long = "show-exif")]
    show_exif: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let source = cli
        .source
        .clone()
        .context("No source folder specified. Use --source DIR (see --help).")?;

    // Handle --show-exif
    if cli.show_exif {
        let images = pipeline::collect_images(&source)?;
        if images.is_empty() {
            anyhow::bail!("No JPEG files found in {}", source.display());
        }
        for image_path in &images {
            print_capture_info(image_path)?;
        }
        return Ok(());
    }

    // Load config, then let flags override it
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if let Some(collision) = cli.collision {
        config.output.collision = collision;
    }
    if cli.albums_dir.is_some() {
        config.albums_dir = cli.albums_dir.clone();
    }
    if cli.archive.is_some() {
        config.archive_dir = cli.archive.clone();
    }

    let dest_dir = match (&cli.dest, &cli.album) {
        (Some(dest), _) => dest.clone(),
        (None, Some(album)) => config.album_path(album).context(
            "--album needs an albums folder. Pass --albums-dir or set albums_dir in the config file.",
        )?,
        (None, None) => anyhow::bail!("No destination specified. Use --dest DIR or --album NAME."),
    };

    let date = cli
        .date
        .context("No capture date specified. Use --date YYYY-MM-DD.")?;

    let coordinate = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(GeoCoordinate::new(lat, lon)),
        _ => None,
    };

    let job = BatchJob {
        source_dir: source,
        dest_dir,
        date,
        coordinate,
        archive_dir: config.archive_dir.clone(),
    };
    let options = BatchOptions::from(&config.output);

    log::info!("Tagging JPEGs in {}", job.source_dir.display());
    log::info!("  -> {}", job.dest_dir.display());
    if options.dry_run {
        log::info!("DRY RUN: no files will be written or moved");
    }

    let report = pipeline::run_batch_with_progress(&job, &options, |progress| {
        if options.dry_run {
            print_preview(&job, date, &progress);
        }
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the current and new values of one file for dry-run mode.
fn print_preview(job: &BatchJob, date: NaiveDate, progress: &Progress<'_>) {
    let path = job.source_dir.join(progress.file_name);
    let existing = match exif::read_capture_info(&path) {
        Ok(info) => info,
        Err(e) => {
            log::debug!("  Could not read {}: {e}", path.display());
            return;
        }
    };

    println!();
    println!("  {BOLD}{}{RESET}", progress.file_name);
    println!("  {DIM}{}{RESET}", "─".repeat(72));

    print_existing("Model", existing.model.as_deref());
    print_existing("DateTimeOriginal", existing.date_taken.as_deref());
    if let (Some(lat), Some(lon)) = (existing.gps_latitude, existing.gps_longitude) {
        print_existing("GPS", Some(&format!("{lat:.6}, {lon:.6}")));
    }

    if let Ok(taken) = DateTaken::from_date(date) {
        print_new("DateTimeOriginal", taken.as_str());
        print_new("DateTimeDigitized", taken.as_str());
    }
    if let Some(c) = &job.coordinate {
        print_new("GPS", &format!("{:.6}, {:.6}", c.latitude, c.longitude));
    }

    println!("  {DIM}{}{RESET}", "─".repeat(72));
}

/// Print an existing EXIF field row.
fn print_existing(tag: &str, value: Option<&str>) {
    if let Some(val) = value {
        if !val.is_empty() {
            print_row(tag, val);
        }
    }
}

/// Print a new value row (green with *).
fn print_new(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    println!("  {GREEN}{tag_col} : {val} *{RESET}");
}

/// Print a single row in the EXIF display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    println!("  {tag_col} : {val}");
}

/// Print capture date, camera and location for a file.
fn print_capture_info(path: &Path) -> Result<()> {
    let data = exif::read_capture_info(path)?;

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let fields: Vec<(&str, Option<&str>)> = vec![
        ("Make", data.make.as_deref()),
        ("Model", data.model.as_deref()),
        ("DateTimeOriginal", data.date_taken.as_deref()),
        ("DateTimeDigitized", data.date_digitized.as_deref()),
    ];
    for (tag, val) in &fields {
        if let Some(v) = val {
            print_row(tag, v);
        }
    }

    if data.has_gps {
        if let Some(lat) = data.gps_latitude {
            print_row("GPSLatitude", &format!("{lat:.6}"));
        }
        if let Some(lon) = data.gps_longitude {
            print_row("GPSLongitude", &format!("{lon:.6}"));
        }
    }

    if !data.has_gps && fields.iter().all(|(_, v)| v.is_none()) {
        println!("  {DIM}(no EXIF metadata found){RESET}");
    }

    Ok(())
}

/// Print the end-of-batch summary.
fn print_summary(report: &BatchReport) {
    if report.status == BatchStatus::NothingToDo {
        println!("No JPEG files to process.");
        return;
    }

    println!();
    for outcome in &report.outcomes {
        let archived = match report.archive_state(&outcome.file_name) {
            ArchiveState::Archived => " (archived)",
            ArchiveState::Failed => " (not archived)",
            ArchiveState::NotArchived => "",
        };
        if outcome.is_success() {
            println!("  {GREEN}ok{RESET}    {}{archived}", outcome.file_name);
        } else {
            println!("  {RED}fail{RESET}  {}", outcome.file_name);
        }
    }
    println!();

    let verb = if report.dry_run { "would be tagged" } else { "tagged" };
    println!(
        "{BOLD}{} of {} {verb}{RESET}, {} failed",
        report.processed_count,
        report.total(),
        report.error_count
    );

    if report.error_count > 0 {
        let names: Vec<&str> = report
            .errors()
            .take(MAX_LISTED_ERRORS)
            .map(|(name, _)| name)
            .collect();
        let more = report.error_count.saturating_sub(MAX_LISTED_ERRORS);
        if more > 0 {
            println!("  Failed: {} and {more} more", names.join(", "));
        } else {
            println!("  Failed: {}", names.join(", "));
        }
        for (name, reason) in report.errors().take(MAX_LISTED_ERRORS) {
            println!("  {DIM}{name}: {reason}{RESET}");
        }
    }

    if let Some(archived) = report.archived_count {
        println!("{archived} original(s) archived");
        for failure in &report.archive_failures {
            println!("  {RED}{}{RESET}: {}", failure.file_name, failure.reason);
        }
    }
}
