//! The outcome of a batch, one entry per candidate file.

use serde::Serialize;

/// Whether the batch did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    /// The source directory held no JPEG files.
    NothingToDo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Success,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn success(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Success,
        }
    }

    pub fn failed(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// An original that was tagged but could not be moved into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFailure {
    pub file_name: String,
    pub reason: String,
}

/// Result of the archive pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub archived: Vec<String>,
    pub failures: Vec<ArchiveFailure>,
}

/// Where an original ended up after the archive pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// No archive pass ran, or the file was not eligible for one.
    NotArchived,
    Archived,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub status: BatchStatus,
    /// Number of files tagged successfully.
    pub processed_count: usize,
    /// Number of files that failed tagging. `processed_count + error_count` is the number
    /// of JPEGs found.
    pub error_count: usize,
    /// One entry per candidate, in processing order.
    pub outcomes: Vec<FileOutcome>,
    /// `None` when no archive directory was requested.
    pub archived_count: Option<usize>,
    pub archived: Vec<String>,
    pub archive_failures: Vec<ArchiveFailure>,
    pub dry_run: bool,
}

impl BatchReport {
    pub fn nothing_to_do(dry_run: bool) -> Self {
        Self {
            status: BatchStatus::NothingToDo,
            processed_count: 0,
            error_count: 0,
            outcomes: Vec::new(),
            archived_count: None,
            archived: Vec::new(),
            archive_failures: Vec::new(),
            dry_run,
        }
    }

    /// Build a completed report. `archive` is `None` when archiving was not requested.
    pub fn completed(outcomes: Vec<FileOutcome>, archive: Option<ArchiveSummary>, dry_run: bool) -> Self {
        let error_count = outcomes.iter().filter(|o| !o.is_success()).count();
        let (archived_count, archived, archive_failures) = match archive {
            Some(summary) => (Some(summary.archived.len()), summary.archived, summary.failures),
            None => (None, Vec::new(), Vec::new()),
        };

        Self {
            status: BatchStatus::Completed,
            processed_count: outcomes.len() - error_count,
            error_count,
            outcomes,
            archived_count,
            archived,
            archive_failures,
            dry_run,
        }
    }

    /// Failed files with their reasons, in processing order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            FileStatus::Failed { reason } => Some((o.file_name.as_str(), reason.as_str())),
            FileStatus::Success => None,
        })
    }

    /// Number of JPEGs the batch looked at.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn archive_state(&self, file_name: &str) -> ArchiveState {
        if self.archived.iter().any(|n| n == file_name) {
            ArchiveState::Archived
        } else if self.archive_failures.iter().any(|f| f.file_name == file_name) {
            ArchiveState::Failed
        } else {
            ArchiveState::NotArchived
        }
    }
}
