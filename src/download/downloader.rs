// src/download/downloader.rs
// =============================================================================
// Writes a RepositoryStructure to disk.
//
// Steps:
// 1. Make sure the output directory exists (the only fatal failure)
// 2. Create every folder of the structure, recording each result
// 3. Stream every file from its download URL, recording each result
//
// A file moves through: pending -> requested -> downloaded | failed, or
// pending -> no-url when the platform gave no download URL. There are no
// retries. Up to `concurrency` files are fetched at once; outcomes are still
// reported in structure order.
// =============================================================================

use crate::download::outcome::{DownloadReport, FileOutcome, FileStatus, FolderOutcome, FolderStatus};
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::structure::{FileDescriptor, RepositoryStructure};
use futures::stream::{self, StreamExt};
use reqwest::{Response, StatusCode};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub struct Downloader {
    client: GitHubClient,
    concurrency: usize,
}

impl Downloader {
    pub fn new(client: GitHubClient, concurrency: usize) -> Self {
        Downloader {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Materializes `structure` under `output_dir`.
    ///
    /// Only a missing or unusable output directory is an error. Everything
    /// else ends up in the returned report. `on_progress(done, total)` is
    /// called after each file.
    pub async fn download<F>(
        &self,
        structure: &RepositoryStructure,
        output_dir: &Path,
        on_progress: F,
    ) -> Result<DownloadReport>
    where
        F: Fn(usize, usize) + Sync,
    {
        ensure_output_dir(output_dir).await?;

        let mut folders = Vec::with_capacity(structure.folders.len());
        for folder in &structure.folders {
            folders.push(create_folder(output_dir, folder).await);
        }

        let total = structure.files.len();
        let counter = AtomicUsize::new(0);
        let done = &counter;
        let on_progress = &on_progress;
        let files: Vec<FileOutcome> = stream::iter(structure.files.iter())
            .map(move |file| async move {
                let outcome = self.download_file(output_dir, file).await;
                let count = done.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(count, total);
                outcome
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = DownloadReport { folders, files };
        info!(
            files = total,
            downloaded = report.downloaded(),
            failed = report.failed(),
            output = %output_dir.display(),
            "download finished"
        );
        Ok(report)
    }

    async fn download_file(&self, output_dir: &Path, file: &FileDescriptor) -> FileOutcome {
        let target = match safe_join(output_dir, &file.request_path) {
            Some(target) => target,
            None => {
                return FileOutcome {
                    request_path: file.request_path.clone(),
                    target: output_dir.to_path_buf(),
                    status: FileStatus::Failed("path escapes the output directory".to_string()),
                }
            }
        };

        let status = match file.download_url.as_deref().filter(|u| !u.is_empty()) {
            None => {
                debug!(path = %file.request_path, "no download URL");
                FileStatus::NoUrl
            }
            Some(url) => match self.fetch_to(url, &target).await {
                Ok(()) => FileStatus::Downloaded,
                Err(err) => {
                    warn!(path = %file.request_path, error = %err, "download failed");
                    FileStatus::Failed(err.to_string())
                }
            },
        };

        FileOutcome {
            request_path: file.request_path.clone(),
            target,
            status,
        }
    }

    async fn fetch_to(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::local_io(parent, e))?;
        }

        let mut response = self.client.request(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: status.canonical_reason().unwrap_or_default().to_string(),
                context: format!("failed to download {}", url),
            });
        }

        let mut out = fs::File::create(target)
            .await
            .map_err(|e| Error::local_io(target, e))?;
        if let Err(err) = write_body(&mut response, &mut out, target).await {
            drop(out);
            discard_partial(target).await;
            return Err(err);
        }
        debug!(url, target = %target.display(), "downloaded");
        Ok(())
    }
}

async fn write_body(response: &mut Response, out: &mut fs::File, target: &Path) -> Result<()> {
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk)
            .await
            .map_err(|e| Error::local_io(target, e))?;
    }
    out.flush().await.map_err(|e| Error::local_io(target, e))
}

// A body that broke off halfway must not be left behind as if complete.
async fn discard_partial(target: &Path) {
    match fs::remove_file(target).await {
        Ok(()) => debug!(target = %target.display(), "removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(target = %target.display(), error = %e, "could not remove partial download"),
    }
}

async fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| Error::local_io(output_dir, e))?;
    let meta = fs::metadata(output_dir)
        .await
        .map_err(|e| Error::local_io(output_dir, e))?;
    if !meta.is_dir() {
        return Err(Error::local_io(
            output_dir,
            io::Error::other("not a directory"),
        ));
    }
    Ok(())
}

async fn create_folder(output_dir: &Path, folder: &str) -> FolderOutcome {
    let Some(path) = safe_join(output_dir, folder) else {
        return FolderOutcome {
            path: output_dir.join(folder),
            status: FolderStatus::Failed("path escapes the output directory".to_string()),
        };
    };
    let status = match fs::create_dir_all(&path).await {
        Ok(()) => FolderStatus::Created,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not create directory");
            FolderStatus::Failed(e.to_string())
        }
    };
    FolderOutcome { path, status }
}

// Joins a request-relative path onto the output directory, refusing
// absolute paths and `..` components.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| root.join(relative))
}
