// src/github/mod.rs
// =============================================================================
// Everything that talks to, or reasons about, the hosting platform:
// - reference: parse a URL or (site, username, repo) into a RepositoryReference
// - models: JSON shapes returned by the REST API
// - client: contents listing, default branch, file/dir detection
// =============================================================================

mod client;
mod models;
mod reference;

pub use client::GitHubClient;
pub use models::{EntryKind, RemoteEntry};
pub use reference::{RepositoryReference, RequestKind, Target};
