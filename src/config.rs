use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for exif-tagger.
///
/// Holds the directories the CLI falls back to when a flag is not given, and the
/// output behavior of a batch.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_tagger::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.albums_dir = Some("/photos/albums".into());
/// config.output.dry_run = true;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose sub-folders are albums (`--album` picks one).
    pub albums_dir: Option<PathBuf>,
    /// Where originals are moved once tagged. No archiving when unset.
    pub archive_dir: Option<PathBuf>,
    /// Output behavior (dry run, collisions).
    pub output: OutputConfig,
}

/// What to do when the destination directory already holds a file of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Leave the existing file and fail this one.
    Skip,
    /// Write `name (1).jpg`, `name (2).jpg`, ...
    Rename,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub collision: CollisionPolicy,
    /// If `true`, tag every file in memory but write and move nothing.
    pub dry_run: bool,
}

impl Config {
    /// Resolve the config file path, in the same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Path of an album folder under `albums_dir`.
    pub fn album_path(&self, album: &str) -> Option<PathBuf> {
        self.albums_dir.as_ref().map(|dir| dir.join(album))
    }
}
