//! Source URLs as cache identities.
//!
//! Listing pages link the same document under several spellings (host case,
//! `#anchors`, campaign parameters). Every spelling must map to one cache key,
//! so the fetcher and the extractor both key on [`canonicalize`]'s output.

use tpd_core::Error;
use url::{ParseError, Url};

/// Query parameters that only track the referrer and never change the page.
const TRACKING_PREFIXES: &[&str] = &["utm_", "mc_"];

fn is_tracking(name: &str) -> bool {
    TRACKING_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Reduce a source URL to the form its cache key is computed on.
///
/// Scheme-less input is read as https. The parser lowercases the host and
/// drops default ports; on top of that the fragment and tracking parameters
/// are removed. Remaining parameters keep their order.
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let invalid = |reason: String| Error::InvalidUrl(format!("{}: {reason}", input.trim()));

    let trimmed = input.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) if !trimmed.is_empty() => {
            Url::parse(&format!("https://{trimmed}")).map_err(|e| invalid(e.to_string()))?
        }
        Err(e) => return Err(invalid(e.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("not a web page ({})", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("no host".into()));
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !is_tracking(name))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Rate-limit bucket for a URL: its host, or the whole URL when it has none.
pub fn host_key(url: &Url) -> String {
    url.host_str().map_or_else(|| url.as_str().to_string(), str::to_string)
}
