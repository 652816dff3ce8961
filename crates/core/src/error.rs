//! Unified error types for the deal tracker.

use std::path::PathBuf;

/// Unified error types shared by the pipeline crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Reading or writing a cache entry failed.
    #[error("CACHE_ERROR: {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached entry exists but could not be decoded.
    #[error("CACHE_CORRUPT: {path}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    /// HTTP client could not be constructed or used.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Serializing an output document failed.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the cache path it happened on.
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::CacheIo { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("empty url".to_string());
        assert!(err.to_string().contains("INVALID_INPUT"));
        assert!(err.to_string().contains("empty url"));
    }

    #[test]
    fn test_cache_io_display_includes_path() {
        let err = Error::cache_io("/tmp/cache/pages/abc.html", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.starts_with("CACHE_ERROR"));
        assert!(msg.contains("abc.html"));
        assert!(msg.contains("disk full"));
    }
}
