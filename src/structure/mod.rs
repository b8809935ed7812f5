// src/structure/mod.rs
// =============================================================================
// Discovery: walks a repository path and produces the flat list of files and
// folders that the downloader (or the tree / JSON output) works from.
//
// Submodules:
// - filter: the --format extension filter
// - builder: the recursive walk and the RepositoryStructure it produces
// =============================================================================

mod builder;
mod filter;

pub use builder::{FileDescriptor, RepositoryStructure, StructureBuilder};
pub use filter::FormatFilter;
