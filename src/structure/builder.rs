// src/structure/builder.rs
// =============================================================================
// Recursive walk of a repository directory into a flat RepositoryStructure.
//
// How it works:
// 1. List the requested directory (one contents call)
// 2. Files that pass the format filter are appended with a path relative to
//    the request root
// 3. Sub-directories are walked recursively; a sub-directory is kept only if
//    its own walk produced at least one file or folder
// 4. Results are folded in listing order, so the output is deterministic
//
// Up to `concurrency` siblings are walked at once and a semaphore bounds the
// number of listing calls in flight across the whole walk. `buffered` keeps
// listing order, so concurrency never changes the output.
//
// Rust concepts:
// - BoxFuture: async recursion needs a boxed, fixed-size future
// - Semaphore: a counter of permits shared between tasks
// =============================================================================

use crate::error::Result;
use crate::github::{EntryKind, GitHubClient, RemoteEntry, RequestKind};
use crate::structure::filter::FormatFilter;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// A single file that survived the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Full path inside the repository
    pub path: String,
    pub name: String,
    pub sha: String,
    pub size: u64,
    pub url: String,
    pub html_url: Option<String>,
    pub git_url: Option<String>,
    /// None when the platform does not serve the file directly
    pub download_url: Option<String>,
    /// Path relative to the request root, used for placement on disk
    pub request_path: String,
}

impl FileDescriptor {
    fn from_entry(entry: RemoteEntry, request_path: String) -> Self {
        FileDescriptor {
            path: entry.path,
            name: entry.name,
            sha: entry.sha,
            size: entry.size,
            url: entry.url,
            html_url: entry.html_url,
            git_url: entry.git_url,
            download_url: entry.download_url,
            request_path,
        }
    }
}

/// Flattened, filtered view of a directory subtree.
///
/// Every `request_path` in `files` is unique, and `folders` only lists
/// directories that contain at least one surviving file somewhere below.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RepositoryStructure {
    pub files: Vec<FileDescriptor>,
    pub folders: Vec<String>,
}

impl RepositoryStructure {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    // Folds a finished child walk in, behind its own folder entry.
    fn absorb(&mut self, folder: String, child: RepositoryStructure) {
        self.folders.push(folder);
        self.folders.extend(child.folders);
        self.files.extend(child.files);
    }
}

/// What one listing entry contributes to its parent.
enum Fragment {
    File(FileDescriptor),
    Dir(String, RepositoryStructure),
    Skip,
}

/// Where a walk happens. Built once per request.
struct Walk<'a> {
    owner: &'a str,
    repo: &'a str,
    git_ref: Option<&'a str>,
    /// Parent of the request root; stripped from every output path.
    parent_path: String,
}

impl Walk<'_> {
    fn relative(&self, full_path: &str) -> String {
        if self.parent_path.is_empty() {
            return full_path.to_string();
        }
        full_path
            .strip_prefix(&self.parent_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(full_path)
            .to_string()
    }
}

pub struct StructureBuilder {
    client: GitHubClient,
    filter: FormatFilter,
    concurrency: usize,
    permits: Arc<Semaphore>,
}

impl StructureBuilder {
    pub fn new(client: GitHubClient, filter: FormatFilter, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        StructureBuilder {
            client,
            filter,
            concurrency,
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Builds the structure for `path` at `git_ref`.
    ///
    /// A file that fails the filter gives an empty structure, not an error.
    /// Any listing failure aborts the whole build.
    pub async fn build(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        path: &str,
        kind: RequestKind,
    ) -> Result<RepositoryStructure> {
        let path = path.trim_matches('/');
        let walk = Walk {
            owner,
            repo,
            git_ref,
            parent_path: path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default(),
        };

        if kind == RequestKind::File && !path.is_empty() {
            return self.build_file(&walk, path).await;
        }

        let mut structure = self.walk_dir(&walk, path.to_string()).await?;
        // The requested directory itself is a folder of the output, as long
        // as something survived inside it.
        if !path.is_empty() && !structure.is_empty() {
            structure.folders.insert(0, walk.relative(path));
        }
        debug!(
            path,
            files = structure.files.len(),
            folders = structure.folders.len(),
            "structure built"
        );
        Ok(structure)
    }

    async fn build_file(&self, walk: &Walk<'_>, path: &str) -> Result<RepositoryStructure> {
        let entry = self
            .client
            .fetch_file(walk.owner, walk.repo, walk.git_ref, path)
            .await?;

        if !self.filter.matches(&entry.name) {
            debug!(path, filter = %self.filter, "requested file excluded by format filter");
            return Ok(RepositoryStructure::default());
        }

        let request_path = entry.name.clone();
        Ok(RepositoryStructure {
            files: vec![FileDescriptor::from_entry(entry, request_path)],
            folders: Vec::new(),
        })
    }

    fn walk_dir<'a>(&'a self, walk: &'a Walk<'a>, path: String) -> BoxFuture<'a, Result<RepositoryStructure>> {
        async move {
            let entries = {
                let _permit = self.permits.acquire().await?;
                self.client
                    .list_directory(walk.owner, walk.repo, walk.git_ref, &path)
                    .await?
            };
            debug!(path = %path, entries = entries.len(), "listed directory");

            let fragments: Vec<Fragment> = stream::iter(entries.into_iter().map(|entry| self.visit(walk, entry)))
                .buffered(self.concurrency)
                .try_collect()
                .await?;

            let mut structure = RepositoryStructure::default();
            for fragment in fragments {
                match fragment {
                    Fragment::File(file) => structure.files.push(file),
                    Fragment::Dir(folder, child) => structure.absorb(folder, child),
                    Fragment::Skip => {}
                }
            }
            Ok(structure)
        }
        .boxed()
    }

    async fn visit<'a>(&'a self, walk: &'a Walk<'a>, entry: RemoteEntry) -> Result<Fragment> {
        match entry.kind {
            EntryKind::File => {
                if !self.filter.matches(&entry.name) {
                    return Ok(Fragment::Skip);
                }
                let request_path = walk.relative(&entry.path);
                Ok(Fragment::File(FileDescriptor::from_entry(entry, request_path)))
            }
            EntryKind::Dir => {
                let child = self.walk_dir(walk, entry.path.clone()).await?;
                if child.is_empty() {
                    debug!(path = %entry.path, "pruned directory without matching files");
                    return Ok(Fragment::Skip);
                }
                Ok(Fragment::Dir(walk.relative(&entry.path), child))
            }
            // Symlinks and submodules have no contents to walk.
            _ => Ok(Fragment::Skip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(server: &str, path: &str, kind: &str) -> Value {
        let name = path.rsplit('/').next().unwrap();
        let download = (kind == "file").then(|| format!("{}/raw/{}", server, path));
        json!({
            "name": name, "path": path, "type": kind, "size": 100, "sha": format!("sha-{}", path),
            "url": format!("{}/api/{}", server, path), "html_url": format!("{}/html/{}", server, path),
            "git_url": format!("{}/git/{}", server, path), "download_url": download
        })
    }

    async fn listing(server: &MockServer, dir: &str, children: &[(&str, &str)]) {
        let body: Vec<Value> = children
            .iter()
            .map(|(p, kind)| entry(&server.uri(), p, kind))
            .collect();
        let api_path = if dir.is_empty() {
            "/repos/o/r/contents".to_string()
        } else {
            format!("/repos/o/r/contents/{}", dir)
        };
        Mock::given(method("GET"))
            .and(path(api_path))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    // o/r@main
    //   README.md
    //   src/main.rs
    //   src/lib/util.rs
    //   src/assets/logo.png
    //   docs/guide/intro.md
    //   docs/guide/deep/more.md
    //   docs/index.md
    async fn sample_repo() -> MockServer {
        let server = MockServer::start().await;
        listing(&server, "", &[("README.md", "file"), ("src", "dir"), ("docs", "dir")]).await;
        listing(
            &server,
            "src",
            &[("src/main.rs", "file"), ("src/lib", "dir"), ("src/assets", "dir")],
        )
        .await;
        listing(&server, "src/lib", &[("src/lib/util.rs", "file")]).await;
        listing(&server, "src/assets", &[("src/assets/logo.png", "file")]).await;
        listing(&server, "docs", &[("docs/guide", "dir"), ("docs/index.md", "file")]).await;
        listing(
            &server,
            "docs/guide",
            &[("docs/guide/intro.md", "file"), ("docs/guide/deep", "dir")],
        )
        .await;
        listing(&server, "docs/guide/deep", &[("docs/guide/deep/more.md", "file")]).await;
        server
    }

    fn builder(server: &MockServer, filter: FormatFilter, concurrency: usize) -> StructureBuilder {
        let client = GitHubClient::new(&server.uri(), None).unwrap();
        StructureBuilder::new(client, filter, concurrency)
    }

    fn request_paths(structure: &RepositoryStructure) -> Vec<&str> {
        structure.files.iter().map(|f| f.request_path.as_str()).collect()
    }

    fn exts(list: &[&str]) -> FormatFilter {
        FormatFilter::Extensions(list.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_src_directory_without_filter() {
        let server = sample_repo().await;
        let structure = builder(&server, FormatFilter::Any, 1)
            .build("o", "r", Some("main"), "src", RequestKind::Dir)
            .await
            .unwrap();

        assert_eq!(
            request_paths(&structure),
            vec!["src/main.rs", "src/lib/util.rs", "src/assets/logo.png"]
        );
        assert_eq!(structure.folders, vec!["src", "src/lib", "src/assets"]);
        assert_eq!(structure.total_size(), 300);
    }

    #[tokio::test]
    async fn test_nested_request_strips_parent_path() {
        let server = sample_repo().await;
        let structure = builder(&server, FormatFilter::Any, 1)
            .build("o", "r", Some("main"), "docs/guide", RequestKind::Dir)
            .await
            .unwrap();

        assert_eq!(request_paths(&structure), vec!["guide/intro.md", "guide/deep/more.md"]);
        assert_eq!(structure.folders, vec!["guide", "guide/deep"]);
        assert_eq!(structure.files[1].path, "docs/guide/deep/more.md");
    }

    #[tokio::test]
    async fn test_directory_with_only_filtered_files_is_pruned() {
        let server = sample_repo().await;
        let structure = builder(&server, exts(&["rs"]), 1)
            .build("o", "r", Some("main"), "", RequestKind::Unknown)
            .await
            .unwrap();

        assert_eq!(request_paths(&structure), vec!["src/main.rs", "src/lib/util.rs"]);
        // src/assets and every docs folder are listed remotely but hold no .rs file
        assert_eq!(structure.folders, vec!["src", "src/lib"]);
    }

    #[tokio::test]
    async fn test_no_extension_filter() {
        let server = MockServer::start().await;
        listing(&server, "bin", &[("bin/a.txt", "file"), ("bin/b", "file")]).await;

        let structure = builder(&server, FormatFilter::NoExtension, 1)
            .build("o", "r", Some("main"), "bin", RequestKind::Dir)
            .await
            .unwrap();

        assert_eq!(request_paths(&structure), vec!["bin/b"]);
    }

    #[tokio::test]
    async fn test_everything_filtered_gives_empty_structure() {
        let server = sample_repo().await;
        let structure = builder(&server, exts(&["exe"]), 1)
            .build("o", "r", Some("main"), "src", RequestKind::Dir)
            .await
            .unwrap();

        assert!(structure.is_empty());
    }

    #[tokio::test]
    async fn test_single_file_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/data/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "big.bin", "path": "data/big.bin", "type": "file", "size": 209715200,
                "sha": "b1", "url": "u", "html_url": "h", "git_url": "g", "download_url": null
            })))
            .mount(&server)
            .await;

        let structure = builder(&server, FormatFilter::Any, 1)
            .build("o", "r", None, "data/big.bin", RequestKind::File)
            .await
            .unwrap();

        assert_eq!(structure.files.len(), 1);
        assert_eq!(structure.files[0].request_path, "big.bin");
        assert_eq!(structure.files[0].download_url, None);
        assert!(structure.folders.is_empty());

        // The same file, excluded by the filter: empty, not an error
        let filtered = builder(&server, exts(&["txt"]), 1)
            .build("o", "r", None, "data/big.bin", RequestKind::File)
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_build_is_idempotent_and_concurrency_independent() {
        let server = sample_repo().await;
        let sequential = builder(&server, FormatFilter::Any, 1);
        let first = sequential.build("o", "r", Some("main"), "", RequestKind::Dir).await.unwrap();
        let second = sequential.build("o", "r", Some("main"), "", RequestKind::Dir).await.unwrap();
        let parallel = builder(&server, FormatFilter::Any, 8)
            .build("o", "r", Some("main"), "", RequestKind::Dir)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, parallel);
        assert_eq!(first.files.len(), 7);
        assert_eq!(
            first.folders,
            vec!["src", "src/lib", "src/assets", "docs", "docs/guide", "docs/guide/deep"]
        );
    }

    #[tokio::test]
    async fn test_descendant_failure_aborts_build() {
        let server = MockServer::start().await;
        listing(&server, "pkg", &[("pkg/ok.rs", "file"), ("pkg/broken", "dir")]).await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/pkg/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let result = builder(&server, FormatFilter::Any, 1)
            .build("o", "r", Some("main"), "pkg", RequestKind::Dir)
            .await;

        match result {
            Err(Error::Upstream { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_limiter_stops_the_walk() {
        let server = sample_repo().await;
        let builder = builder(&server, FormatFilter::Any, 2);
        builder.permits.close();

        let result = builder.build("o", "r", Some("main"), "src", RequestKind::Dir).await;
        assert!(matches!(result, Err(Error::WalkStopped(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_relative_paths() {
        let walk = Walk {
            owner: "o",
            repo: "r",
            git_ref: None,
            parent_path: "a/b".to_string(),
        };
        assert_eq!(walk.relative("a/b/c/d.txt"), "c/d.txt");
        assert_eq!(walk.relative("a/bc/d.txt"), "a/bc/d.txt");
    }
}
