// src/github/models.rs
// =============================================================================
// Wire types for the two GitHub REST endpoints we use:
//   GET /repos/{owner}/{repo}                  -> RepoMetadata
//   GET /repos/{owner}/{repo}/contents/{path}  -> Contents
//
// The contents endpoint answers with a JSON array for a directory and with a
// single object for a file. `Contents` is an untagged enum so serde picks the
// right shape for us.
// =============================================================================

use serde::{Deserialize, Serialize};

/// One item of a directory listing (or the single item for a file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Full path inside the repository, e.g. "src/lib/util.rs"
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,
    /// Blob SHA
    pub sha: String,
    /// Canonical API URL
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub git_url: Option<String>,
    /// None when the platform refuses to serve the file directly
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// Body of a contents call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Listing(Vec<RemoteEntry>),
    File(Box<RemoteEntry>),
}

/// The only field of the repository metadata we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    #[serde(default)]
    pub default_branch: Option<String>,
}
