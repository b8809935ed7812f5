// src/github/client.rs
// =============================================================================
// Thin wrapper around reqwest for the GitHub REST API.
//
// Provides:
// - list_directory / fetch_file: the contents endpoint (one call each)
// - default_branch: the repository endpoint
// - resolve_kind: decides whether a path is a file or a directory
// - request: an authenticated GET, reused by the downloader
//
// Status mapping: 404 -> Error::NotFound, any other non-2xx ->
// Error::Upstream with the status and response body, malformed JSON ->
// Error::Decode.
// =============================================================================

use crate::error::{Error, Result};
use crate::github::models::{Contents, EntryKind, RemoteEntry, RepoMetadata};
use crate::github::reference::RequestKind;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!("repo-slice/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client plus the credential attached to every call.
///
/// Cheap to clone: reqwest's Client is reference counted internally.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: Option<String>) -> Result<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| Error::InvalidInput(format!("invalid API base '{}': {}", api_base, e)))?;
        let http = Client::builder().build()?;
        Ok(GitHubClient {
            http,
            api_base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// A GET request carrying the GitHub Accept header and, if present, the
    /// bearer credential.
    pub fn request(&self, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .get(url)
            .header(ACCEPT, ACCEPT_GITHUB_JSON)
            .header(USER_AGENT, CLIENT_USER_AGENT);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Lists the immediate children of a directory, in the order the API
    /// returns them.
    pub async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        path: &str,
    ) -> Result<Vec<RemoteEntry>> {
        match self.get_contents(owner, repo, git_ref, path).await? {
            Contents::Listing(entries) => Ok(entries),
            Contents::File(_) => Err(Error::Decode(format!(
                "expected a directory listing at '{}', got a file",
                path
            ))),
        }
    }

    /// Metadata of a single file.
    pub async fn fetch_file(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        path: &str,
    ) -> Result<RemoteEntry> {
        match self.get_contents(owner, repo, git_ref, path).await? {
            Contents::File(entry) => Ok(*entry),
            Contents::Listing(_) => Err(Error::Decode(format!(
                "expected file details at '{}', got a directory listing",
                path
            ))),
        }
    }

    /// One call to the contents endpoint. Owner and repo are lowercased since
    /// the API is case-insensitive on them.
    async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        path: &str,
    ) -> Result<Contents> {
        let owner = owner.to_lowercase();
        let repo = repo.to_lowercase();
        let url = self.contents_url(&owner, &repo, path, git_ref)?;
        let location = describe(&owner, &repo, path, git_ref);

        let response = self.get(url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(location));
        }
        if !status.is_success() {
            return Err(upstream(response, format!("failed to fetch contents of {}", location)).await);
        }
        decode(response, &location).await
    }

    /// The repository's default branch.
    pub async fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        let url = self.repo_url(owner, repo)?;
        let response = self.get(url).await?;
        if !response.status().is_success() {
            let context = format!(
                "failed to fetch repo info - check repository owner ({}), repo ({}), or token permissions (token {})",
                owner,
                repo,
                if self.token.is_some() { "provided" } else { "not provided" }
            );
            return Err(upstream(response, context).await);
        }

        let meta: RepoMetadata = decode(response, &format!("{}/{}", owner, repo)).await?;
        meta.default_branch
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::Decode(format!("no default branch found for {}/{}", owner, repo)))
    }

    /// Decides whether `parent_path/request_path` is a file or a directory.
    ///
    /// An empty request path names the repository root, which is listed once
    /// so that a missing repository or ref is reported as NotFound.
    /// With a parent, the parent is listed and the child looked up by name.
    /// At the repository root there is nothing to list, so the path itself is
    /// fetched: an array answer means directory, an object means file.
    pub async fn resolve_kind(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        parent_path: &str,
        request_path: &str,
    ) -> Result<RequestKind> {
        if request_path.is_empty() {
            // The repository root is always a directory, but the listing
            // still has to exist at this ref.
            self.list_directory(owner, repo, git_ref, parent_path).await?;
            return Ok(RequestKind::Dir);
        }

        if !parent_path.is_empty() {
            let siblings = self.list_directory(owner, repo, git_ref, parent_path).await?;
            let location = format!("{}/{}", parent_path, request_path);
            let kind = siblings
                .iter()
                .find(|entry| entry.name == request_path)
                .and_then(|entry| kind_of(entry.kind))
                .ok_or(Error::NotFound(location))?;
            debug!(parent_path, request_path, ?kind, "resolved kind from parent listing");
            return Ok(kind);
        }

        let kind = match self.get_contents(owner, repo, git_ref, request_path).await? {
            Contents::Listing(entries) if !entries.is_empty() => RequestKind::Dir,
            Contents::File(entry) => match kind_of(entry.kind) {
                Some(kind) => kind,
                None => return Err(Error::NotFound(request_path.to_string())),
            },
            Contents::Listing(_) => return Err(Error::NotFound(request_path.to_string())),
        };
        debug!(request_path, ?kind, "resolved kind at repository root");
        Ok(kind)
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!(%url, "GET");
        Ok(self.request(url.as_str()).send().await?)
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str, git_ref: Option<&str>) -> Result<Url> {
        let mut url = self.api_url(&["repos", owner, repo, "contents"])?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::InvalidInput(format!("'{}' cannot be an API base", self.api_base)))?;
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        if let Some(git_ref) = git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        Ok(url)
    }

    fn repo_url(&self, owner: &str, repo: &str) -> Result<Url> {
        self.api_url(&["repos", owner, repo])
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidInput(format!("'{}' cannot be an API base", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// Symlinks and submodules have no contents to download and are skipped by
// the walk, so they do not resolve either.
fn kind_of(kind: EntryKind) -> Option<RequestKind> {
    match kind {
        EntryKind::File => Some(RequestKind::File),
        EntryKind::Dir => Some(RequestKind::Dir),
        EntryKind::Symlink | EntryKind::Submodule | EntryKind::Other => None,
    }
}

fn describe(owner: &str, repo: &str, path: &str, git_ref: Option<&str>) -> String {
    let mut location = format!("{}/{}", owner, repo);
    if !path.is_empty() {
        location.push('/');
        location.push_str(path);
    }
    if let Some(git_ref) = git_ref {
        location.push('@');
        location.push_str(git_ref);
    }
    location
}

async fn upstream(response: Response, context: String) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Upstream {
        status,
        body,
        context,
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Decode(format!("{}: {}", what, e)))
}
