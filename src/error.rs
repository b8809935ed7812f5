// src/error.rs
// =============================================================================
// Error taxonomy for the resolve -> discover -> download pipeline.
//
// Two families of errors live here:
// - Resolution errors (bad input, unknown platform, 404s, upstream failures,
//   undecodable JSON). These are fatal for the whole invocation.
// - LocalIo, which the downloader records per item instead of propagating.
//
// NotFound is kept distinct from Upstream because --check reports it as
// {"exists": false} rather than as a failure.
// =============================================================================

use std::path::PathBuf;

/// Errors produced while resolving a repository reference, walking its
/// contents, or writing files to disk.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Conflicting or missing input, detected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A site id that is not present in the platform table.
    #[error("invalid site ID '{0}'")]
    UnknownPlatform(String),

    /// A configured platform that has no contents API to talk to.
    #[error("platform '{0}' has no contents API configured")]
    UnsupportedPlatform(String),

    /// A URL that matches no configured platform, or lacks owner/repo segments.
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    /// The remote answered 404 for the given path or repository.
    #[error("path not found: {0}")]
    NotFound(String),

    /// Any other non-2xx answer. Status and body are kept for diagnosis.
    #[error("{context}: {status} {body}")]
    Upstream {
        status: u16,
        body: String,
        context: String,
    },

    /// A 2xx answer whose body was not the JSON we expected.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Creating or writing a local file or directory failed.
    #[error("{}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The listing limiter was shut down while a walk was still running.
    #[error("directory walk stopped: {0}")]
    WalkStopped(#[from] tokio::sync::AcquireError),

    /// The request never produced a status (DNS, TLS, connection reset...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    /// True for the "path not found" sentinel used by the existence check.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguished() {
        assert!(Error::NotFound("src".to_string()).is_not_found());
        assert!(!Error::Decode("bad".to_string()).is_not_found());
        let upstream = Error::Upstream {
            status: 500,
            body: "boom".to_string(),
            context: "listing src".to_string(),
        };
        assert!(!upstream.is_not_found());
    }

    #[test]
    fn test_upstream_message_keeps_status_and_body() {
        let err = Error::Upstream {
            status: 403,
            body: "rate limited".to_string(),
            context: "failed to list octo/demo".to_string(),
        };
        assert_eq!(err.to_string(), "failed to list octo/demo: 403 rate limited");
    }

    #[test]
    fn test_local_io_message_includes_path() {
        let err = Error::local_io(
            "out/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "out/a.txt: denied");
    }
}
