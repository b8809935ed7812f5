// src/download/mod.rs
// =============================================================================
// Materialization: writes a discovered structure to the local disk.
//
// Submodules:
// - downloader: creates folders and streams files, best effort
// - outcome: per-folder / per-file results collected along the way
// =============================================================================

mod downloader;
mod outcome;

pub use downloader::Downloader;
pub use outcome::{DownloadReport, FileOutcome, FileStatus, FolderOutcome, FolderStatus};
