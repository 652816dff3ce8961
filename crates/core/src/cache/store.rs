//! Flat-directory cache store.
//!
//! One directory per namespace, one file per key. A file's presence is the
//! only validity signal; nothing expires.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::hash::CacheKey;
use crate::Error;

/// Logical partition of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Raw response bodies keyed by request.
    Pages,
    /// Plain text extracted from pages, keyed by URL.
    Extracted,
    /// Classification payloads keyed by content hash.
    Classifications,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Pages, Namespace::Extracted, Namespace::Classifications];

    /// Directory name under the cache root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Namespace::Pages => "pages",
            Namespace::Extracted => "extracted",
            Namespace::Classifications => "classifications",
        }
    }

    /// File extension for entries in this namespace.
    pub fn extension(self) -> &'static str {
        match self {
            Namespace::Pages => "html",
            Namespace::Extracted => "txt",
            Namespace::Classifications => "json",
        }
    }
}

/// Handle to an on-disk cache root.
///
/// Cheap to clone; every component that needs caching holds its own copy.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a store rooted at `root`. Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace_dir(&self, ns: Namespace) -> PathBuf {
        self.root.join(ns.dir_name())
    }

    pub fn entry_path(&self, ns: Namespace, key: &CacheKey) -> PathBuf {
        self.namespace_dir(ns).join(format!("{}.{}", key, ns.extension()))
    }

    /// Read an entry. A missing entry is `Ok(None)`, not an error.
    pub async fn get(&self, ns: Namespace, key: &CacheKey) -> Result<Option<Vec<u8>>, Error> {
        let path = self.entry_path(ns, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(namespace = ns.dir_name(), %key, "cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(namespace = ns.dir_name(), %key, "cache miss");
                Ok(None)
            }
            Err(e) => Err(Error::cache_io(path, e)),
        }
    }

    /// Write an entry, creating the namespace directory if needed.
    ///
    /// Overwrites any previous value under the same key.
    pub async fn put(&self, ns: Namespace, key: &CacheKey, bytes: &[u8]) -> Result<(), Error> {
        let dir = self.namespace_dir(ns);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::cache_io(&dir, e))?;

        let path = self.entry_path(ns, key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::cache_io(&path, e))?;

        tracing::debug!(namespace = ns.dir_name(), %key, bytes = bytes.len(), "cached entry");
        Ok(())
    }

    pub async fn get_text(&self, ns: Namespace, key: &CacheKey) -> Result<Option<String>, Error> {
        match self.get(ns, key).await? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| Error::CacheCorrupt {
                path: self.entry_path(ns, key),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    pub async fn put_text(&self, ns: Namespace, key: &CacheKey, text: &str) -> Result<(), Error> {
        self.put(ns, key, text.as_bytes()).await
    }

    /// Read and decode a JSON entry.
    pub async fn get_json<T: DeserializeOwned>(&self, ns: Namespace, key: &CacheKey) -> Result<Option<T>, Error> {
        match self.get(ns, key).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| Error::CacheCorrupt {
                path: self.entry_path(ns, key),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Encode a value as pretty-printed JSON and write it.
    pub async fn put_json<T: Serialize>(&self, ns: Namespace, key: &CacheKey, value: &T) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(value)?;
        self.put(ns, key, &json).await
    }

    /// Delete every top-level file in a namespace.
    ///
    /// Subdirectories are left alone. A namespace that was never written
    /// clears to zero.
    pub async fn clear(&self, ns: Namespace) -> Result<usize, Error> {
        let dir = self.namespace_dir(ns);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::cache_io(&dir, e)),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::cache_io(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| Error::cache_io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            tokio::fs::remove_file(entry.path())
                .await
                .map_err(|e| Error::cache_io(entry.path(), e))?;
            count += 1;
        }

        tracing::info!(namespace = ns.dir_name(), count, "cleared cached files from {}", dir.display());
        Ok(count)
    }

    /// Number of top-level files in a namespace.
    pub async fn entry_count(&self, ns: Namespace) -> Result<usize, Error> {
        let dir = self.namespace_dir(ns);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::cache_io(&dir, e)),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::cache_io(&dir, e))? {
            if entry.file_type().await.is_ok_and(|t| t.is_file()) {
                count += 1;
            }
        }
        Ok(count)
    }
}
