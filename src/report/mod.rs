// src/report/mod.rs
// =============================================================================
// Presentation for the four output modes:
// - --print-info: JSON of the resolved reference and structure
// - --check: {"exists": true|false}
// - --print-tree: see tree.rs
// - download (default): header, progress bar, outcome lines
// =============================================================================

mod size;
mod tree;

pub use size::format_size;
pub use tree::render_tree;

use crate::download::DownloadReport;
use crate::github::RepositoryReference;
use crate::structure::{FormatFilter, RepositoryStructure};
use serde::Serialize;
use std::path::Path;

const BAR_WIDTH: usize = 20;

#[derive(Serialize)]
struct Info<'a> {
    parsed: &'a RepositoryReference,
    structure: &'a RepositoryStructure,
}

pub fn info_json(
    reference: &RepositoryReference,
    structure: &RepositoryStructure,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Info {
        parsed: reference,
        structure,
    })
}

pub fn exists_json(exists: bool) -> String {
    serde_json::json!({ "exists": exists }).to_string()
}

/// The block printed before a download starts.
pub fn download_header(
    reference: &RepositoryReference,
    structure: &RepositoryStructure,
    filter: &FormatFilter,
    output_dir: &Path,
) -> String {
    let mut lines = vec![
        "Downloading folders and files".to_string(),
        String::new(),
        format!("REPO: {}/{}", reference.owner, reference.repo),
        format!("PATH: {}", reference.path),
    ];
    if let Some(commit) = &reference.commit {
        lines.push(format!("COMMIT: {}", commit));
    } else if let Some(branch) = &reference.branch {
        lines.push(format!("BRANCH: {}", branch));
    }
    lines.push(format!("SIZE: {}", format_size(structure.total_size())));
    lines.push(format!(
        "OBJECTS: ({} files, {} folders)",
        structure.files.len(),
        structure.folders.len()
    ));
    if !filter.is_any() {
        lines.push(format!("FORMATS: {}", filter));
    }
    lines.push(format!("SAVED IN: {}", output_dir.display()));
    lines.join("\n")
}

/// `[==========          ] 5/10`
pub fn progress_bar(done: usize, total: usize) -> String {
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (done.min(total) * BAR_WIDTH) / total
    };
    format!(
        "[{}{}] {}/{}",
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        done,
        total
    )
}

/// One line per folder, then one per file, in report order.
pub fn outcome_lines(report: &DownloadReport) -> Vec<String> {
    report
        .folders
        .iter()
        .map(ToString::to_string)
        .chain(report.files.iter().map(ToString::to_string))
        .collect()
}
