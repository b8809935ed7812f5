// src/github/reference.rs
// =============================================================================
// Turns what the user typed into a RepositoryReference.
//
// Two input shapes are accepted (exactly one of them):
// - a URL such as https://github.com/octo/demo/tree/main/src
// - a (site, username, repo) triple such as ("github", "octo", "demo")
//
// Supported URL formats:
//   - https://github.com/owner/repo
//   - github.com/owner/repo            (scheme is added)
//   - https://github.com/owner/repo.git
//   - https://github.com/owner/repo/tree/<ref>/<path...>
//   - https://github.com/owner/repo/blob/<ref>/<path...>
//
// No I/O happens here. The ref and the request kind may still be unknown
// afterwards; the pipeline fills them in.
// =============================================================================

use crate::config::Platform;
use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// What the user asked for, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    Triple {
        site: String,
        username: String,
        repo: String,
    },
}

impl Target {
    /// Builds a target from the raw CLI fields. Either the URL or all three
    /// triple fields must be present, never both.
    pub fn from_parts(
        url: Option<String>,
        site: Option<String>,
        username: Option<String>,
        repo: Option<String>,
    ) -> Result<Self> {
        let url = url.filter(|u| !u.trim().is_empty());
        let has_triple = site.is_some() || username.is_some() || repo.is_some();

        match (url, has_triple) {
            (Some(_), true) | (None, false) => Err(Error::InvalidInput(
                "must provide either a URL or all of --site, --username and --repo".to_string(),
            )),
            (Some(url), false) => Ok(Target::Url(url.trim().to_string())),
            (None, true) => match (site, username, repo) {
                (Some(site), Some(username), Some(repo)) => Ok(Target::Triple {
                    site,
                    username,
                    repo,
                }),
                _ => Err(Error::InvalidInput(
                    "must provide all of --site, --username and --repo".to_string(),
                )),
            },
        }
    }
}

/// Whether the requested path is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    File,
    Dir,
    #[default]
    Unknown,
}

/// A normalized pointer into a hosted repository.
///
/// At most one of `branch` / `commit` is set. `url` is rebuilt by the
/// pipeline once the final ref is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryReference {
    pub url: String,
    pub name: String,
    pub id: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub commit: Option<String>,
    /// Full path inside the repository, no leading or trailing slash.
    pub path: String,
    /// Everything in `path` before the last segment.
    pub parent_path: String,
    /// The last segment of `path`.
    pub request_path: String,
    pub request_kind: RequestKind,
}

impl RepositoryReference {
    /// Resolves `target` against the platform table.
    ///
    /// Returns the reference together with the platform it belongs to.
    pub fn resolve<'a>(
        target: &Target,
        platforms: &'a [Platform],
    ) -> Result<(Self, &'a Platform)> {
        match target {
            Target::Url(url) => Self::from_url(url, platforms),
            Target::Triple {
                site,
                username,
                repo,
            } => Self::from_triple(site, username, repo, platforms),
        }
    }

    fn from_triple<'a>(
        site: &str,
        username: &str,
        repo: &str,
        platforms: &'a [Platform],
    ) -> Result<(Self, &'a Platform)> {
        let site_id = site.to_lowercase();
        let platform = platforms
            .iter()
            .find(|p| p.id == site_id)
            .ok_or_else(|| Error::UnknownPlatform(site.to_string()))?;

        let url = platform
            .url_struc
            .site
            .replace("<username>", username)
            .replace("<repo>", repo);

        let reference = RepositoryReference {
            url,
            name: platform.name.clone(),
            id: platform.id.clone(),
            owner: username.to_string(),
            repo: repo.to_string(),
            ..Default::default()
        };
        Ok((reference, platform))
    }

    fn from_url<'a>(raw: &str, platforms: &'a [Platform]) -> Result<(Self, &'a Platform)> {
        let url = normalize_scheme(raw);

        // Longest matching prefix wins, so "https://www.github.com/" beats
        // a shorter entry that happens to share a prefix.
        let (platform, base) = platforms
            .iter()
            .flat_map(|p| p.url.site.iter().map(move |site| (p, site.as_str())))
            .filter(|(_, site)| url.starts_with(site))
            .max_by_key(|(_, site)| site.len())
            .ok_or_else(|| {
                Error::MalformedUrl(format!("{} does not match any configured platform", raw))
            })?;

        // Drop query string and fragment before splitting.
        let remainder = &url[base.len()..];
        let remainder = remainder
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        // Browser URLs carry encoded segments ("my%20docs"); the client
        // encodes them again when it builds API URLs.
        let segments: Vec<String> = remainder
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();

        if segments.len() < 2 {
            return Err(Error::MalformedUrl(format!(
                "{} is missing the username or repo",
                raw
            )));
        }

        let mut reference = RepositoryReference {
            url: raw.to_string(),
            name: platform.name.clone(),
            id: platform.id.clone(),
            owner: segments[0].to_string(),
            repo: segments[1].trim_end_matches(".git").to_string(),
            ..Default::default()
        };

        if segments.len() >= 4 && matches!(segments[2].as_str(), "blob" | "tree") {
            let git_ref = segments[3].as_str();
            // Hex-looking branch names are indistinguishable from short
            // hashes here and are always taken as commits.
            if is_potential_commit_hash(git_ref) {
                reference.commit = Some(git_ref.to_string());
            } else {
                reference.branch = Some(git_ref.to_string());
            }
            if segments.len() > 4 {
                reference.set_path(&segments[4..].join("/"));
            }
        }

        Ok((reference, platform))
    }

    /// Replaces the path and recomputes the parent / request split.
    pub fn set_path(&mut self, path: &str) {
        let path = path.trim_matches('/');
        self.path = path.to_string();
        match path.rsplit_once('/') {
            Some((parent, last)) => {
                self.parent_path = parent.to_string();
                self.request_path = last.to_string();
            }
            None => {
                self.parent_path.clear();
                self.request_path = path.to_string();
            }
        }
    }

    /// The commit if one is set, otherwise the branch.
    pub fn git_ref(&self) -> Option<&str> {
        self.commit.as_deref().or(self.branch.as_deref())
    }
}

/// True when `s` is 7 to 40 hex characters.
pub fn is_potential_commit_hash(s: &str) -> bool {
    (7..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

// A bare host ("github.com/a/b") gets the canonical https scheme.
fn normalize_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}
