//! Keyword gates that run before any network or paid work.

use crate::config::{AppConfig, CountryWatch};

/// Zero-cost relevance gate over a candidate's title and snippet.
#[derive(Debug, Clone)]
pub struct Prefilter {
    enabled: bool,
    keywords: Vec<String>,
}

impl Prefilter {
    /// Build a gate from explicit keywords. Matching is case-insensitive.
    pub fn new(enabled: bool, keywords: &[String]) -> Self {
        Self { enabled, keywords: keywords.iter().map(|k| k.to_lowercase()).collect() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.prefilter_enabled, &config.prefilter_keywords())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the candidate should proceed. Always true when disabled.
    pub fn passes(&self, title: &str, snippet: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let text = format!("{title} {snippet}").to_lowercase();
        let passed = self.keywords.iter().any(|kw| text.contains(kw.as_str()));
        if !passed {
            tracing::debug!("pre-filter rejected: {}", title.chars().take(60).collect::<String>());
        }
        passed
    }
}

/// Whether a listing title names a watched country AND a tech or deal keyword.
///
/// `only` narrows the check to a single watched country.
pub fn matches_watchlist(
    title: &str, countries: &[CountryWatch], only: Option<&CountryWatch>, keywords: &[String],
) -> bool {
    let title = title.to_lowercase();

    let country_match = match only {
        Some(country) => names_match(&title, country),
        None => countries.iter().any(|c| names_match(&title, c)),
    };
    if !country_match {
        return false;
    }

    keywords.iter().any(|kw| title.contains(&kw.to_lowercase()))
}

fn names_match(title_lower: &str, country: &CountryWatch) -> bool {
    country.names.iter().any(|name| title_lower.contains(&name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> Prefilter {
        Prefilter::from_config(&AppConfig::default())
    }

    #[test]
    fn test_rejects_unrelated() {
        assert!(!default_filter().passes("Weather Update", "sunny skies"));
    }

    #[test]
    fn test_accepts_title_only() {
        assert!(default_filter().passes("Japan AI Partnership", ""));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(default_filter().passes("QUANTUM COMPUTING AGREEMENT", ""));
    }

    #[test]
    fn test_matches_in_snippet() {
        assert!(default_filter().passes("Fact Sheet", "a bilateral agreement on shipbuilding"));
    }

    #[test]
    fn test_disabled_passes_everything() {
        let filter = Prefilter::new(false, &["quantum".to_string()]);
        assert!(!filter.is_enabled());
        assert!(filter.passes("Weather Update", "sunny skies"));
    }

    #[test]
    fn test_keywords_lowercased() {
        let filter = Prefilter::new(true, &["MOU".to_string()]);
        assert!(filter.passes("Signed mou with Seoul", ""));
    }

    #[test]
    fn test_watchlist_needs_country_and_keyword() {
        let config = AppConfig::default();
        let keywords = config.prefilter_keywords();
        assert!(matches_watchlist("US-Japan Technology Prosperity Deal", &config.countries, None, &keywords));
        assert!(!matches_watchlist("Technology Prosperity Deal", &config.countries, None, &keywords));
        assert!(!matches_watchlist("President visits Japan", &config.countries, None, &keywords));
    }

    #[test]
    fn test_watchlist_single_country() {
        let config = AppConfig::default();
        let keywords = config.prefilter_keywords();
        let uk = config.country("UK");
        assert!(matches_watchlist("UK semiconductor pact", &config.countries, uk, &keywords));
        assert!(!matches_watchlist("Korea semiconductor pact", &config.countries, uk, &keywords));
    }
}
