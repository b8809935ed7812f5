// src/pipeline.rs
// =============================================================================
// Runs the resolution phase for one invocation:
//
//   URL / triple -> RepositoryReference
//                -> ref (explicit commit, URL commit, explicit branch,
//                   URL branch, else the default branch)
//                -> canonical URL rebuilt from the platform templates
//                -> file or directory?
//                -> RepositoryStructure
//
// Any error here is fatal for the invocation; no partial structure is ever
// handed to the downloader.
// =============================================================================

use crate::config::Platform;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, RepositoryReference, RequestKind, Target};
use crate::structure::{FormatFilter, RepositoryStructure, StructureBuilder};
use tracing::{debug, info};

/// A fully validated invocation, as produced by the CLI layer.
#[derive(Debug, Clone)]
pub struct Request {
    pub target: Target,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub path: Option<String>,
    pub filter: FormatFilter,
    pub token: Option<String>,
    pub concurrency: usize,
}

/// A reference whose ref and kind are settled, plus the client that did it.
#[derive(Debug)]
pub struct Resolved {
    pub reference: RepositoryReference,
    pub client: GitHubClient,
}

/// Everything the output modes need.
#[derive(Debug)]
pub struct Discovery {
    pub reference: RepositoryReference,
    pub structure: RepositoryStructure,
    /// Client bound to the resolved platform, reused for downloads.
    pub client: GitHubClient,
}

/// Resolves the target without walking it. Fails with NotFound when the
/// path does not exist at the selected ref.
pub async fn resolve(request: &Request, platforms: &[Platform]) -> Result<Resolved> {
    let (mut reference, platform) = RepositoryReference::resolve(&request.target, platforms)?;
    let api = platform
        .api
        .as_deref()
        .ok_or_else(|| Error::UnsupportedPlatform(platform.name.clone()))?;

    let token = request
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| platform.fallback_token().map(str::to_string));
    let client = GitHubClient::new(api, token)?;

    if let Some(path) = request.path.as_deref().filter(|p| !p.trim_matches('/').is_empty()) {
        reference.set_path(path);
    }

    select_ref(&mut reference, request, &client).await?;

    reference.request_kind = client
        .resolve_kind(
            &reference.owner,
            &reference.repo,
            reference.git_ref(),
            &reference.parent_path,
            &reference.request_path,
        )
        .await?;
    reference.url = canonical_url(platform, &reference);
    info!(url = %reference.url, kind = ?reference.request_kind, "resolved request");

    Ok(Resolved { reference, client })
}

/// Resolves the target and builds its structure.
pub async fn discover(request: &Request, platforms: &[Platform]) -> Result<Discovery> {
    let Resolved { reference, client } = resolve(request, platforms).await?;
    let builder = StructureBuilder::new(client.clone(), request.filter.clone(), request.concurrency);
    let structure = builder
        .build(
            &reference.owner,
            &reference.repo,
            reference.git_ref(),
            &reference.path,
            reference.request_kind,
        )
        .await?;

    Ok(Discovery {
        reference,
        structure,
        client,
    })
}

// Precedence: explicit commit, URL commit, explicit branch, URL branch,
// default branch. Leaves exactly one of branch / commit set.
async fn select_ref(
    reference: &mut RepositoryReference,
    request: &Request,
    client: &GitHubClient,
) -> Result<()> {
    let explicit_commit = request.commit.clone().filter(|c| !c.is_empty());
    let explicit_branch = request.branch.clone().filter(|b| !b.is_empty());

    if let Some(commit) = explicit_commit {
        reference.commit = Some(commit);
        reference.branch = None;
    } else if reference.commit.is_some() {
        reference.branch = None;
    } else if let Some(branch) = explicit_branch {
        reference.branch = Some(branch);
    } else if reference.branch.is_none() {
        let branch = client.default_branch(&reference.owner, &reference.repo).await?;
        debug!(%branch, "using default branch");
        reference.branch = Some(branch);
    }
    Ok(())
}

/// The platform URL for the resolved ref, path and kind.
pub fn canonical_url(platform: &Platform, reference: &RepositoryReference) -> String {
    let templates = &platform.url_struc;
    let is_file = reference.request_kind == RequestKind::File;
    let (template, placeholder, git_ref) = match (&reference.commit, &reference.branch) {
        (Some(commit), _) => (
            if is_file { &templates.commit_file } else { &templates.commit_folder },
            "<commit>",
            commit.as_str(),
        ),
        (None, Some(branch)) => (
            if is_file { &templates.branch_file } else { &templates.branch_folder },
            "<branch>",
            branch.as_str(),
        ),
        (None, None) => (&templates.site, "<branch>", ""),
    };
    let template = if template.is_empty() { &templates.site } else { template };

    template
        .replace("<username>", &reference.owner)
        .replace("<repo>", &reference.repo)
        .replace(placeholder, git_ref)
        .replace("<path>", &reference.path)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn platforms_for(server: &MockServer) -> Vec<Platform> {
        let mut platforms = Config::load(None).unwrap().platforms;
        for platform in platforms.iter_mut().filter(|p| p.id == "github") {
            platform.api = Some(server.uri());
        }
        platforms
    }

    fn request(url: &str) -> Request {
        Request {
            target: Target::Url(url.to_string()),
            branch: None,
            commit: None,
            path: None,
            filter: FormatFilter::Any,
            token: None,
            concurrency: 1,
        }
    }

    fn file_entry(path: &str) -> serde_json::Value {
        json!({
            "name": path.rsplit('/').next().unwrap(), "path": path, "type": "file", "size": 3,
            "sha": "s", "url": "u", "html_url": "h", "git_url": "g",
            "download_url": format!("https://raw.example/{}", path)
        })
    }

    #[tokio::test]
    async fn test_default_branch_is_used_when_no_ref_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"default_branch": "trunk"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents"))
            .and(query_param("ref", "trunk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("README.md")])))
            .mount(&server)
            .await;

        let discovery = discover(&request("github.com/octo/demo"), &platforms_for(&server))
            .await
            .unwrap();

        assert_eq!(discovery.reference.branch.as_deref(), Some("trunk"));
        assert_eq!(discovery.reference.request_kind, RequestKind::Dir);
        assert_eq!(discovery.reference.url, "https://github.com/octo/demo/tree/trunk");
        assert_eq!(discovery.structure.files.len(), 1);
        assert!(discovery.structure.folders.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_commit_wins_over_url_branch() {
        let server = MockServer::start().await;
        // "src" sits at the root, so its kind comes from listing it directly
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/src"))
            .and(query_param("ref", "abc1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("src/lib.rs")])))
            .mount(&server)
            .await;

        let mut req = request("https://github.com/octo/demo/tree/main/src");
        req.commit = Some("abc1234".to_string());
        req.branch = Some("ignored".to_string());
        let discovery = discover(&req, &platforms_for(&server)).await.unwrap();

        assert_eq!(discovery.reference.commit.as_deref(), Some("abc1234"));
        assert_eq!(discovery.reference.branch, None);
        assert_eq!(discovery.reference.url, "https://github.com/octo/demo/tree/abc1234/src");
        assert_eq!(discovery.structure.folders, vec!["src"]);
        assert_eq!(discovery.structure.files[0].request_path, "src/lib.rs");
    }

    #[tokio::test]
    async fn test_resolve_stops_before_the_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/src"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("src/lib.rs")])))
            .expect(1)
            .mount(&server)
            .await;

        let req = request("https://github.com/octo/demo/tree/main/src");
        let resolved = resolve(&req, &platforms_for(&server)).await.unwrap();
        assert_eq!(resolved.reference.request_kind, RequestKind::Dir);
        assert_eq!(resolved.reference.branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_missing_ref_at_repository_root_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let req = request("https://github.com/nobody/nothing/tree/nope");
        let err = resolve(&req, &platforms_for(&server)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_path_flag_pointing_at_a_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("docs/guide.md")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/docs/guide.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(file_entry("docs/guide.md")))
            .mount(&server)
            .await;

        let mut req = request("https://github.com/octo/demo");
        req.branch = Some("dev".to_string());
        req.path = Some("/docs/guide.md/".to_string());
        let discovery = discover(&req, &platforms_for(&server)).await.unwrap();

        assert_eq!(discovery.reference.request_kind, RequestKind::File);
        assert_eq!(discovery.reference.parent_path, "docs");
        assert_eq!(discovery.reference.url, "https://github.com/octo/demo/blob/dev/docs/guide.md");
        assert_eq!(discovery.structure.files[0].request_path, "guide.md");
    }

    #[tokio::test]
    async fn test_missing_path_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_entry("docs/a.md")])))
            .mount(&server)
            .await;

        let req = request("https://github.com/octo/demo/tree/main/docs/nope.md");
        let err = discover(&req, &platforms_for(&server)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_platform_without_api_is_rejected() {
        let server = MockServer::start().await;
        let req = request("https://gitlab.com/group/project");
        let err = discover(&req, &platforms_for(&server)).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(name) if name == "GitLab"));
    }

    #[test]
    fn test_canonical_url_without_ref_uses_site_template() {
        let platforms = Config::load(None).unwrap().platforms;
        let reference = RepositoryReference {
            owner: "octo".to_string(),
            repo: "demo".to_string(),
            ..Default::default()
        };
        assert_eq!(canonical_url(&platforms[0], &reference), "https://github.com/octo/demo");
    }
}
