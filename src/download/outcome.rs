// src/download/outcome.rs
// =============================================================================
// What happened to each folder and file during a download.
//
// These values are only reported, never acted upon: one failed file does not
// change what happens to the others.
// =============================================================================

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FolderStatus {
    Created,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FileStatus {
    Downloaded,
    /// The platform gave no download URL (e.g. files too large to serve raw)
    NoUrl,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FolderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub request_path: String,
    pub target: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Directory outcomes in creation order, then file outcomes in structure order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub folders: Vec<FolderOutcome>,
    pub files: Vec<FileOutcome>,
}

impl DownloadReport {
    pub fn downloaded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Downloaded)
            .count()
    }

    pub fn failed(&self) -> usize {
        let folders = self
            .folders
            .iter()
            .filter(|f| matches!(f.status, FolderStatus::Failed(_)))
            .count();
        let files = self
            .files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed(_)))
            .count();
        folders + files
    }
}

impl fmt::Display for FolderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FolderStatus::Created => write!(f, "Created directory: {}", self.path.display()),
            FolderStatus::Failed(msg) => {
                write!(f, "Error creating directory {}: {}", self.path.display(), msg)
            }
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FileStatus::Downloaded => write!(f, "Downloaded: {}", self.target.display()),
            FileStatus::NoUrl => write!(f, "No download URL for file {}", self.request_path),
            FileStatus::Failed(msg) => write!(f, "Error downloading {}: {}", self.request_path, msg),
        }
    }
}
