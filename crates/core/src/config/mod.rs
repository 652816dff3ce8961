//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TPD_*, plus the conventional ANTHROPIC_API_KEY)
//! 2. TOML config file (if TPD_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is immutable; components borrow it in their
//! constructors and copy out what they need.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::text::TruncationConfig;

mod validation;

pub use validation::ConfigError;

/// Version string stamped into every output document.
pub const SCRAPER_VERSION: &str = "1.0.0";

/// A country the tracker follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryWatch {
    /// Short key used on the command line (e.g. "South Korea").
    pub key: String,
    /// Spellings that identify the country in a title.
    pub names: Vec<String>,
    /// ISO 3166-1 alpha-3 code.
    pub code: String,
    pub formal_name: String,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TPD_*)
/// 2. TOML config file (if TPD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key for the extraction call.
    ///
    /// Set via TPD_ANTHROPIC_API_KEY or ANTHROPIC_API_KEY.
    /// Required unless the run stops before classification.
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    /// Model used for classification (cheapest tier by default).
    #[serde(default = "default_model")]
    pub model: String,

    /// Model selected by `--model premium`.
    #[serde(default = "default_premium_model")]
    pub premium_model: String,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Root of the three cache namespaces.
    ///
    /// Set via TPD_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory receiving deals.json / deals.raw.json.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum delay between two requests to the same host, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// First backoff step in milliseconds; attempt `n` waits `base * 2^n`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Attempt ceiling for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_true")]
    pub prefilter_enabled: bool,

    #[serde(default = "default_tech_keywords")]
    pub tech_keywords: Vec<String>,

    #[serde(default = "default_deal_keywords")]
    pub deal_keywords: Vec<String>,

    #[serde(default = "default_true")]
    pub truncation_enabled: bool,

    #[serde(default)]
    pub truncation: TruncationConfig,

    /// Apply the batch discount to the cost estimate.
    #[serde(default)]
    pub batch_mode: bool,

    /// Cap on candidates classified per run; `None` processes everything.
    #[serde(default = "default_max_deals")]
    pub max_deals: Option<usize>,

    #[serde(default = "default_countries")]
    pub countries: Vec<CountryWatch>,
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".into()
}

fn default_premium_model() -> String {
    "claude-opus-4-5-20250220".into()
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.cache")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_user_agent() -> String {
    "tpd-tracker/0.1".into()
}

fn default_request_delay_ms() -> u64 {
    1_500
}

fn default_backoff_base_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_max_deals() -> Option<usize> {
    Some(50)
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn default_tech_keywords() -> Vec<String> {
    words(&[
        "technology",
        "AI",
        "artificial intelligence",
        "semiconductor",
        "quantum",
        "6G",
        "biotech",
        "biotechnology",
        "nuclear",
        "fusion",
        "cyber",
        "digital",
        "chip",
        "data center",
        "cloud",
        "software",
        "manufacturing",
        "computing",
        "telecom",
        "telecommunications",
        "robotics",
        "space",
    ])
}

fn default_deal_keywords() -> Vec<String> {
    words(&[
        "prosperity",
        "trade deal",
        "partnership",
        "agreement",
        "investment",
        "bilateral",
        "memorandum",
        "MOU",
        "commitment",
        "contract",
        "deal",
        "cooperation",
        "framework",
        "pact",
        "accord",
    ])
}

fn default_countries() -> Vec<CountryWatch> {
    vec![
        CountryWatch {
            key: "UK".into(),
            names: words(&["United Kingdom", "UK", "U.K.", "Britain", "British", "Great Britain", "England"]),
            code: "GBR".into(),
            formal_name: "United Kingdom of Great Britain and Northern Ireland".into(),
        },
        CountryWatch {
            key: "Japan".into(),
            names: words(&["Japan", "Japanese", "JPN"]),
            code: "JPN".into(),
            formal_name: "Japan".into(),
        },
        CountryWatch {
            key: "South Korea".into(),
            names: words(&["South Korea", "Korea", "Korean", "Republic of Korea", "ROK", "R.O.K.", "S. Korea"]),
            code: "KOR".into(),
            formal_name: "Republic of Korea".into(),
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: default_anthropic_base_url(),
            model: default_model(),
            premium_model: default_premium_model(),
            max_output_tokens: default_max_output_tokens(),
            cache_dir: default_cache_dir(),
            data_dir: default_data_dir(),
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            prefilter_enabled: true,
            tech_keywords: default_tech_keywords(),
            deal_keywords: default_deal_keywords(),
            truncation_enabled: true,
            truncation: TruncationConfig::default(),
            batch_mode: false,
            max_deals: default_max_deals(),
            countries: default_countries(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Keywords checked by the relevance pre-filter (tech terms, then deal terms).
    pub fn prefilter_keywords(&self) -> Vec<String> {
        self.tech_keywords.iter().chain(&self.deal_keywords).cloned().collect()
    }

    /// Look up a watched country by its command-line key.
    pub fn country(&self, key: &str) -> Option<&CountryWatch> {
        self.countries.iter().find(|c| c.key == key)
    }

    /// Formal name for an ISO code, falling back to the code itself.
    pub fn country_name(&self, code: &str) -> String {
        self.countries
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.formal_name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    /// Resolve a `--model` argument; `"premium"` selects the premium tier.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested {
            Some("premium") => self.premium_model.clone(),
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.model.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TPD_`
    /// 2. `ANTHROPIC_API_KEY`
    /// 3. TOML file from `TPD_CONFIG_FILE` (if set)
    /// 4. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TPD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(Env::raw().only(&["ANTHROPIC_API_KEY"]).map(|_| "anthropic_api_key".into()))
            .merge(
                Env::prefixed("TPD_")
                    .ignore(&["CONFIG_FILE"])
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the API key is available before any paid call is attempted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is unset or blank.
    pub fn require_anthropic_api_key(&self) -> Result<&str, ConfigError> {
        self.anthropic_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "anthropic_api_key".into(),
                hint: "Set ANTHROPIC_API_KEY (or TPD_ANTHROPIC_API_KEY), or use --dry-run / --fetch-only".into(),
            })
    }
}
