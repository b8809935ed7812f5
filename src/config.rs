// src/config.rs
// =============================================================================
// Platform and format tables.
//
// platforms.json describes each hosting site: the URL prefixes we recognise,
// the REST API base, and the templates used to rebuild a canonical URL once
// the ref and path are known.
//
// formats.json maps category names ("image", "code", ...) to extensions so
// that `-f image` works as a shorthand.
//
// Both files are compiled into the binary from config/. A directory given
// with --config-dir (or REPO_SLICE_CONFIG_DIR) replaces the built-in copies.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_PLATFORMS: &str = include_str!("../config/platforms.json");
const DEFAULT_FORMATS: &str = include_str!("../config/formats.json");

pub const PLATFORMS_FILE: &str = "platforms.json";
pub const FORMATS_FILE: &str = "formats.json";

/// One hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub id: String,
    /// Credential used when neither --token nor GITHUB_TOKEN is set.
    #[serde(default)]
    pub public_token: String,
    /// REST API base, e.g. https://api.github.com
    #[serde(default)]
    pub api: Option<String>,
    #[serde(rename = "URL")]
    pub url: PlatformUrls,
    #[serde(rename = "URLStruc")]
    pub url_struc: UrlTemplates,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformUrls {
    /// Base prefixes a user-supplied URL may start with.
    pub site: Vec<String>,
    #[serde(default)]
    pub raw: Vec<String>,
}

/// URL templates with `<username>`, `<repo>`, `<branch>`, `<commit>` and
/// `<path>` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlTemplates {
    pub site: String,
    pub commit_folder: String,
    pub commit_file: String,
    pub branch_folder: String,
    pub branch_file: String,
}

impl Platform {
    /// The credential to fall back on, if the platform ships one.
    pub fn fallback_token(&self) -> Option<&str> {
        Some(self.public_token.as_str()).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatTable {
    #[serde(default)]
    pub formats: HashMap<String, Vec<String>>,
}

impl FormatTable {
    /// Extensions registered under a category name, if it is one.
    pub fn category(&self, name: &str) -> Option<&[String]> {
        self.formats.get(name).map(Vec::as_slice)
    }
}

/// Everything read from the config directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub platforms: Vec<Platform>,
    pub formats: FormatTable,
}

impl Config {
    /// Loads the tables from `dir`, or the built-in defaults when `dir` is None.
    /// A file missing from `dir` falls back to its built-in default.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let platforms_json = read_or_default(dir, PLATFORMS_FILE, DEFAULT_PLATFORMS)?;
        let formats_json = read_or_default(dir, FORMATS_FILE, DEFAULT_FORMATS)?;

        let platforms: Vec<Platform> = serde_json::from_str(&platforms_json)
            .with_context(|| format!("Error parsing {}", PLATFORMS_FILE))?;
        let formats: FormatTable = serde_json::from_str(&formats_json)
            .with_context(|| format!("Error parsing {}", FORMATS_FILE))?;

        tracing::debug!(platforms = platforms.len(), categories = formats.formats.len(), "loaded config");

        Ok(Config { platforms, formats })
    }
}

fn read_or_default(dir: Option<&Path>, file: &str, default: &str) -> Result<String> {
    match dir.map(|d| d.join(file)) {
        Some(path) if path.exists() => std::fs::read_to_string(&path)
            .with_context(|| format!("Error reading config file {}", path.display())),
        _ => Ok(default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_parses() {
        let config = Config::load(None).unwrap();
        let github = config.platforms.iter().find(|p| p.id == "github").unwrap();
        assert_eq!(github.api.as_deref(), Some("https://api.github.com"));
        assert!(github.url.site.iter().any(|s| s == "https://github.com/"));
        assert!(config.formats.category("image").unwrap().contains(&"png".to_string()));
    }

    #[test]
    fn test_config_dir_overrides_platforms() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PLATFORMS_FILE),
            r#"[{"name": "Local", "id": "local", "api": "http://localhost:9000",
                 "URL": {"site": ["http://git.local/"]},
                 "URLStruc": {"site": "http://git.local/<username>/<repo>",
                              "commit_folder": "", "commit_file": "",
                              "branch_folder": "", "branch_file": ""}}]"#,
        )
        .unwrap();

        let config = Config::load(Some(dir.path())).unwrap();
        assert_eq!(config.platforms.len(), 1);
        assert_eq!(config.platforms[0].id, "local");
        assert_eq!(config.platforms[0].fallback_token(), None);
        // formats.json was not provided, so the default is used
        assert!(config.formats.category("code").is_some());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FORMATS_FILE), "{not json").unwrap();
        let err = Config::load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains(FORMATS_FILE));
    }
}
