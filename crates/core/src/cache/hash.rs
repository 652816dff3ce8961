//! Content-addressed cache key generation.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Width of a cache key in hex characters.
pub const KEY_LEN: usize = 16;

/// A fixed-width hex digest identifying one cache entry within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a plain GET of `url`.
    pub fn for_url(url: &str) -> Self {
        Self(digest(url))
    }

    /// Key for text content (classification dedup).
    pub fn for_content(content: &str) -> Self {
        Self(digest(content))
    }

    /// Key for a request that varies by query parameters or a JSON body.
    ///
    /// The fingerprint is serialized canonically, so `{"a":1,"b":2}` and
    /// `{"b":2,"a":1}` produce the same key.
    pub fn for_request(url: &str, fingerprint: &RequestFingerprint<'_>) -> Self {
        Self(digest(&request_input(url, fingerprint)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The part of a request, beyond its URL, that changes the response.
#[derive(Debug, Clone, Copy)]
pub enum RequestFingerprint<'a> {
    None,
    /// Query parameters, appended as `?<canonical json>`.
    Params(&'a Value),
    /// A JSON request body, appended as `|<canonical json>`.
    Body(&'a Value),
}

/// Build the string that is hashed for a request key.
pub fn request_input(url: &str, fingerprint: &RequestFingerprint<'_>) -> String {
    match fingerprint {
        RequestFingerprint::None => url.to_string(),
        RequestFingerprint::Params(params) => format!("{url}?{}", canonical_json(params)),
        RequestFingerprint::Body(body) => format!("{url}|{}", canonical_json(body)),
    }
}

/// Serialize a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(KEY_LEN);
    hex
}
