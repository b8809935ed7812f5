// src/structure/filter.rs
// =============================================================================
// File-extension filter applied while walking a repository.
//
// Accepted --format values:
//   (absent)        -> no filtering
//   ""              -> only files without an extension
//   image           -> a category from formats.json
//   [jpg,PDF, png]  -> an explicit list (brackets optional, case-insensitive)
// =============================================================================

use crate::config::FormatTable;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormatFilter {
    #[default]
    Any,
    /// Files whose name has no extension.
    NoExtension,
    /// Lowercase extensions without the leading dot.
    Extensions(BTreeSet<String>),
}

impl FormatFilter {
    /// Parses a raw --format value.
    pub fn parse(raw: Option<&str>, table: &FormatTable) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(FormatFilter::Any);
        };
        let raw = raw.trim();
        // `-f ""` reaches us either empty or with the quotes intact
        if raw.is_empty() || raw == r#""""# || raw == "''" {
            return Ok(FormatFilter::NoExtension);
        }

        if let Some(extensions) = table.category(&raw.to_lowercase()) {
            return Ok(Self::from_extensions(extensions.iter().map(String::as_str)));
        }

        let list = raw.trim_start_matches('[').trim_end_matches(']');
        let filter = Self::from_extensions(list.split(','));
        match &filter {
            FormatFilter::Extensions(set) if !set.is_empty() => Ok(filter),
            _ => Err(Error::InvalidInput(format!("invalid format '{}'", raw))),
        }
    }

    fn from_extensions<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Self {
        FormatFilter::Extensions(
            extensions
                .into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    /// True when a file called `name` passes the filter.
    pub fn matches(&self, name: &str) -> bool {
        let extension = extension_of(name);
        match self {
            FormatFilter::Any => true,
            FormatFilter::NoExtension => extension.is_none(),
            FormatFilter::Extensions(set) => extension.is_some_and(|ext| set.contains(&ext)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, FormatFilter::Any)
    }
}

// Lowercased suffix after the last dot. A leading dot counts, so
// ".gitignore" has the extension "gitignore".
fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}

impl fmt::Display for FormatFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatFilter::Any => write!(f, "all"),
            FormatFilter::NoExtension => write!(f, "(no extension)"),
            FormatFilter::Extensions(set) => {
                let list: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "[{}]", list.join(", "))
            }
        }
    }
}
