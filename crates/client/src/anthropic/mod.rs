//! Anthropic Messages API client.
//!
//! ### API contract
//!
//! - **Endpoint**: `{base_url}/v1/messages`
//! - **Authentication**: `x-api-key` header, `anthropic-version: 2023-06-01`.
//! - **Failures**: 401/403 map to `AuthError`, 429 to `RateLimited`, anything
//!   else non-2xx to `HttpError`. Callers treat every failure as a soft,
//!   per-candidate error; nothing here retries or exits.
//! - **Credentials**: checked once at construction, so a missing key fails
//!   before any candidate is processed.

pub mod error;
pub mod request;
pub mod response;

pub use error::AnthropicError;
pub use request::{EXTRACTION_PROMPT, Message, MessagesRequest, build_prompt};
pub use response::{ContentBlock, MessagesResponse, Usage};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use tpd_core::{AppConfig, ConfigError};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Generation can take far longer than a page fetch.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Turns page text into the raw model reply for the extraction prompt.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Model used for the calls, for cost accounting.
    fn model(&self) -> &str;

    /// Send one extraction request; returns the reply text verbatim.
    async fn extract_deals(&self, text: &str) -> Result<String, AnthropicError>;
}

/// Anthropic client configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub user_agent: String,
}

impl AnthropicConfig {
    /// Build from application config for the given model.
    pub fn from_app_config(config: &AppConfig, model: &str) -> Result<Self, ConfigError> {
        let api_key = config.require_anthropic_api_key()?.to_string();

        Ok(Self {
            api_key,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens: config.max_output_tokens,
            timeout: DEFAULT_TIMEOUT,
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a new client with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self, AnthropicError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "anthropic_api_key".into(),
                hint: "Set ANTHROPIC_API_KEY".into(),
            }
            .into());
        }

        let http = reqwest::Client::builder().timeout(config.timeout).use_rustls_tls().build()?;

        Ok(Self { http, config })
    }

    /// Create a client straight from application config.
    pub fn from_app_config(config: &AppConfig, model: &str) -> Result<Self, AnthropicError> {
        Self::new(AnthropicConfig::from_app_config(config, model)?)
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    /// Execute a messages request and return the decoded response.
    pub async fn create_message(&self, req: &MessagesRequest) -> Result<MessagesResponse, AnthropicError> {
        let start = Instant::now();
        let url = format!("{}/v1/messages", self.config.base_url);

        tracing::debug!("calling messages API: model={}", req.model);

        let http_response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .json(req)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("messages API response status: {}", status);

        if !status.is_success() {
            return Err(AnthropicError::from_status(status.as_u16()));
        }

        let bytes = http_response.bytes().await?;
        let response: MessagesResponse =
            serde_json::from_slice(&bytes).map_err(|e| AnthropicError::Parse(e.to_string()))?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                "message completed in {:?}: {} input / {} output tokens",
                start.elapsed(),
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(response)
    }
}

#[async_trait]
impl ExtractionService for AnthropicClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn extract_deals(&self, text: &str) -> Result<String, AnthropicError> {
        let req = MessagesRequest::extraction(&self.config.model, self.config.max_tokens, text);
        let response = self.create_message(&req).await?;
        response.first_text().map(str::to_string).ok_or(AnthropicError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> AppConfig {
        AppConfig { anthropic_api_key: key.map(str::to_string), ..AppConfig::default() }
    }

    #[test]
    fn test_config_missing_key() {
        let result = AnthropicConfig::from_app_config(&config_with_key(None), "claude-3-5-haiku-20241022");
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_config_blank_key() {
        let result = AnthropicConfig::from_app_config(&config_with_key(Some("  ")), "claude-3-5-haiku-20241022");
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app = config_with_key(Some("sk-ant-test"));
        app.anthropic_base_url = "http://localhost:8080/".into();

        let config = AnthropicConfig::from_app_config(&app, "claude-opus-4-5-20250220").unwrap();
        assert_eq!(config.api_key, "sk-ant-test");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.model, "claude-opus-4-5-20250220");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_client_new_missing_key() {
        let result = AnthropicClient::from_app_config(&config_with_key(None), "claude-3-5-haiku-20241022");
        assert!(matches!(result, Err(AnthropicError::Config(ConfigError::Missing { .. }))));
    }

    #[test]
    fn test_client_new_with_key() {
        let client = AnthropicClient::from_app_config(&config_with_key(Some("sk-ant-test")), "model-x").unwrap();
        assert_eq!(client.model(), "model-x");
        assert_eq!(client.config().timeout, DEFAULT_TIMEOUT);
    }
}
