//! File-backed, content-addressed cache.
//!
//! Three flat namespaces live under one cache root:
//!
//! - `pages/` raw response bodies, keyed by request
//! - `extracted/` clean text, keyed by URL
//! - `classifications/` AI extraction payloads, keyed by content hash
//!
//! Entries never expire; a warm cache makes a re-run free of network
//! requests, HTML parsing and paid calls.

pub mod hash;
pub mod store;

pub use hash::{CacheKey, RequestFingerprint, canonical_json};
pub use store::{CacheStore, Namespace};
