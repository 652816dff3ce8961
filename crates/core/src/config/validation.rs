//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_retries` is 0 or greater than 10
    /// - `request_delay_ms` exceeds one minute
    /// - `user_agent`, `model` or `cache_dir` is empty
    /// - the truncation head budget is not smaller than the word budget
    /// - a watched country has no code or no names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must be at least 1"));
        }
        if self.max_retries > 10 {
            return Err(invalid("max_retries", "must not exceed 10"));
        }

        if self.request_delay_ms > 60_000 {
            return Err(invalid("request_delay_ms", "must not exceed 60000ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.model.is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(invalid("cache_dir", "must not be empty"));
        }

        if self.truncation.max_words == 0 {
            return Err(invalid("truncation.max_words", "must be greater than 0"));
        }
        if self.truncation.head_words >= self.truncation.max_words {
            return Err(invalid("truncation.head_words", "must be smaller than truncation.max_words"));
        }

        for country in &self.countries {
            if country.code.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "countries".into(),
                    reason: format!("country '{}' has no code", country.key),
                });
            }
            if country.names.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "countries".into(),
                    reason: format!("country '{}' has no names", country.key),
                });
            }
        }

        if self.prefilter_enabled && self.tech_keywords.is_empty() && self.deal_keywords.is_empty() {
            tracing::warn!("pre-filter is enabled with no keywords; every candidate will be skipped");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TruncationConfig;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_zero_retries() {
        let config = AppConfig { max_retries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_retries"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_head_not_below_budget() {
        let truncation = TruncationConfig { max_words: 500, head_words: 500, ..Default::default() };
        let config = AppConfig { truncation, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "truncation.head_words"));
    }

    #[test]
    fn test_validate_country_without_code() {
        let mut config = AppConfig::default();
        config.countries[0].code.clear();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "countries"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, max_retries: 1, request_delay_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
