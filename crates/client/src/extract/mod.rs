//! Page text extraction.
//!
//! ### Algorithm
//! - Non-content elements (scripts, navigation, chrome, forms) are dropped.
//! - The first content-like container wins: `<article>`, `<main>`, a div whose
//!   class or id looks like content, `<body>`, then the whole document.
//! - Text nodes are trimmed and emitted one per line; blank runs collapse.
//!
//! ### Caching
//! - Results live in the `extracted` namespace keyed by the canonical URL, so
//!   each page is parsed at most once over the cache's lifetime.

pub mod html;

pub use html::html_to_text;

use std::sync::Arc;

use tpd_core::{CacheKey, CacheStore, Error, Namespace};

use crate::fetch::{Fetcher, canonicalize};

/// Fetches pages and turns them into cached plain text.
pub struct TextExtractor {
    fetcher: Arc<Fetcher>,
    store: CacheStore,
}

impl TextExtractor {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        let store = fetcher.store().clone();
        Self { fetcher, store }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Text for `url`, fetching and parsing it on a cache miss.
    ///
    /// `Ok(None)` means the page could not be fetched.
    pub async fn extract(&self, url: &str) -> Result<Option<String>, Error> {
        let key = self.key_for(url)?;

        if let Some(text) = self.store.get_text(Namespace::Extracted, &key).await? {
            tracing::debug!("cache hit (extracted): {}", url);
            return Ok(Some(text));
        }

        let Some(html) = self.fetcher.fetch_url(url).await? else {
            return Ok(None);
        };

        let text = html_to_text(&html);
        self.store.put_text(Namespace::Extracted, &key, &text).await?;
        tracing::info!("extracted {} chars from {}", text.len(), url);

        Ok(Some(text))
    }

    /// Previously extracted text for `url`; never touches the network.
    pub async fn extract_cached(&self, url: &str) -> Result<Option<String>, Error> {
        let key = self.key_for(url)?;
        self.store.get_text(Namespace::Extracted, &key).await
    }

    fn key_for(&self, url: &str) -> Result<CacheKey, Error> {
        Ok(CacheKey::for_url(canonicalize(url)?.as_str()))
    }
}
