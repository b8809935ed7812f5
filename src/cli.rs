// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// A repository is named either by URL:
//
//   repo-slice https://github.com/octo/demo/tree/main/docs
//
// or by the triple --site/--username/--repo:
//
//   repo-slice -s github -u octo -r demo -p docs
//
// The four output modes (--no-print, --print-tree, --check, --print-info)
// are mutually exclusive; with none of them the slice is downloaded with a
// progress bar.
//
// Rust concepts:
// - ArgGroup: lets clap reject conflicting flags for us
// - env = "...": a flag that can also come from an environment variable
// =============================================================================

use crate::config::FormatTable;
use crate::error::Result;
use crate::github::Target;
use crate::pipeline::Request;
use crate::structure::FormatFilter;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repo-slice",
    version,
    about = "Download a single folder or file from a hosted Git repository",
    long_about = "repo-slice resolves a repository URL (or site/user/repo triple) to a branch or \
                  commit, walks the requested folder through the platform's contents API and \
                  downloads it, optionally filtered by file extension."
)]
#[command(group(
    ArgGroup::new("mode")
        .args(["no_print", "print_tree", "check", "print_info"])
        .multiple(false)
))]
pub struct Cli {
    /// Repository URL, e.g. https://github.com/user/repo/tree/main/src
    pub url: Option<String>,

    /// Site id from the platform table (github, ...)
    #[arg(short = 's', long)]
    pub site: Option<String>,

    /// Repository owner
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Repository name
    #[arg(short = 'r', long)]
    pub repo: Option<String>,

    /// Branch to read from (a commit wins over it)
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// Commit to read from
    #[arg(short = 'c', long)]
    pub commit: Option<String>,

    /// Path inside the repository, overriding the one in the URL
    #[arg(short = 'p', long)]
    pub path: Option<String>,

    /// Directory the slice is written to
    #[arg(short = 'o', long, default_value = ".")]
    pub output: String,

    /// Extension filter: a category (image, code, ...), a list like
    /// "[md,rs]" or "md,rs", or "" for files without an extension
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// API token (falls back to the platform's public token)
    #[arg(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum number of concurrent API calls and downloads
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Directory holding platforms.json / formats.json overrides
    #[arg(long, env = "REPO_SLICE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Download without printing anything
    #[arg(short = 'n', long)]
    pub no_print: bool,

    /// Print the tree of files that would be downloaded
    #[arg(long)]
    pub print_tree: bool,

    /// Only report whether the path exists, as JSON
    #[arg(long)]
    pub check: bool,

    /// Print the resolved reference and structure as JSON
    #[arg(short = 'i', long)]
    pub print_info: bool,
}

/// What to do once the structure is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Download,
    Silent,
    Tree,
    Check,
    Info,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.no_print {
            Mode::Silent
        } else if self.print_tree {
            Mode::Tree
        } else if self.check {
            Mode::Check
        } else if self.print_info {
            Mode::Info
        } else {
            Mode::Download
        }
    }

    /// Output directory with trailing slashes removed ("/" stays "/").
    pub fn output_dir(&self) -> PathBuf {
        let trimmed = self.output.trim_end_matches('/');
        if trimmed.is_empty() && !self.output.is_empty() {
            PathBuf::from("/")
        } else if trimmed.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(trimmed)
        }
    }

    /// Validates the raw arguments into a pipeline request.
    pub fn to_request(&self, formats: &FormatTable) -> Result<Request> {
        let target = Target::from_parts(
            self.url.clone(),
            self.site.clone(),
            self.username.clone(),
            self.repo.clone(),
        )?;
        let filter = FormatFilter::parse(self.format.as_deref(), formats)?;
        let path = self
            .path
            .as_deref()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Request {
            target,
            branch: self.branch.clone(),
            commit: self.commit.clone(),
            path,
            filter,
            token: self.token.clone(),
            concurrency: usize::from(self.concurrency),
        })
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<String> for the URL?
//    - The URL is optional because the --site/--username/--repo triple can
//      replace it. clap leaves it None when it is absent.
//
// 2. Why not let clap check "URL or triple"?
//    - Target::from_parts does it, so the same rule applies however a
//      Request is built (tests build them directly).
//
// 3. What does value_parser!(u16).range(1..) do?
//    - It rejects --concurrency 0 at parse time with a normal clap error.
// -----------------------------------------------------------------------------
