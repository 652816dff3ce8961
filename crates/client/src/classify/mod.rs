//! Cost-gated deal classification.
//!
//! ### Gates, cheapest first
//! 1. Keyword pre-filter on title and snippet (free).
//! 2. Truncation to the word budget (fewer input tokens).
//! 3. Classification cache keyed by the exact text that would be sent; a hit
//!    is free and identical text is never sent twice.
//! 4. One paid call that returns the parent agreement and all child
//!    commitments together.
//!
//! Any parseable reply is cached, including "not relevant" ones. Malformed
//! replies are not cached and produce no records.

pub mod response;

pub use response::{
    ChildFields, Classification, DealPayload, ParentFields, Records, build_records, parse_reply, strip_fences,
};

use std::sync::Arc;

use serde_json::Value;
use tpd_core::cost::estimate_cost;
use tpd_core::models::{CostStats, RawCandidate};
use tpd_core::text::{Prefilter, TruncationConfig, truncate_text};
use tpd_core::{AppConfig, CacheKey, CacheStore, Namespace};

use crate::anthropic::{AnthropicError, ExtractionService};

/// Errors from classifying one candidate; all are recoverable per item.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("AI call failed: {0}")]
    Service(#[from] AnthropicError),

    #[error("malformed classification response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Cache(#[from] tpd_core::Error),
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rejected by the pre-filter; no call made.
    Skipped,
    NotRelevant,
    Extracted(Records),
}

/// Runs candidates through the gates and keeps the run's cost counters.
pub struct Classifier {
    service: Arc<dyn ExtractionService>,
    store: CacheStore,
    prefilter: Prefilter,
    truncation: Option<TruncationConfig>,
    config: AppConfig,
    stats: CostStats,
}

impl Classifier {
    pub fn new(config: &AppConfig, store: CacheStore, service: Arc<dyn ExtractionService>) -> Self {
        let stats =
            CostStats::new(service.model(), config.prefilter_enabled, config.truncation_enabled, config.batch_mode);
        let truncation = config.truncation_enabled.then(|| config.truncation.clone());

        Self { service, store, prefilter: Prefilter::from_config(config), truncation, config: config.clone(), stats }
    }

    pub fn stats(&self) -> &CostStats {
        &self.stats
    }

    /// Pre-filter gate. Counts a skip when the candidate is rejected.
    pub fn admit(&mut self, candidate: &RawCandidate) -> bool {
        if self.prefilter.passes(&candidate.title, &candidate.snippet) {
            return true;
        }

        self.stats.prefilter_skipped += 1;
        false
    }

    /// Classify page text for an already admitted candidate.
    pub async fn classify_text(&mut self, text: &str) -> Result<Classification, ClassifyError> {
        let text = match &self.truncation {
            Some(truncation) => truncate_text(text, truncation),
            None => text.into(),
        };

        let key = CacheKey::for_content(&text);

        if let Some(cached) = self.store.get_json::<Value>(Namespace::Classifications, &key).await? {
            self.stats.cache_hits += 1;
            tracing::debug!("cache hit (classification): {}", key);
            return Classification::from_value(&cached);
        }

        let reply = self.service.extract_deals(&text).await?;
        let value = parse_reply(&reply).inspect_err(|e| tracing::error!("{}", e))?;
        let classification = Classification::from_value(&value)?;

        self.store.put_json(Namespace::Classifications, &key, &value).await?;
        self.stats.new_api_calls += 1;
        tracing::info!("cached classification: {} (relevant: {})", key, classification.is_relevant());

        Ok(classification)
    }

    /// Full pipeline for one candidate: pre-filter, classify, build records.
    pub async fn classify(
        &mut self, candidate: &RawCandidate, page_text: &str, counter: u64,
    ) -> Result<Outcome, ClassifyError> {
        if !self.admit(candidate) {
            return Ok(Outcome::Skipped);
        }
        self.classify_admitted(candidate, page_text, counter).await
    }

    /// Classify and build records for a candidate that already passed [`Classifier::admit`].
    pub async fn classify_admitted(
        &mut self, candidate: &RawCandidate, page_text: &str, counter: u64,
    ) -> Result<Outcome, ClassifyError> {
        match self.classify_text(page_text).await? {
            Classification::NotRelevant => Ok(Outcome::NotRelevant),
            Classification::Relevant(payload) => {
                Ok(Outcome::Extracted(build_records(&payload, candidate, counter, &self.config)))
            }
        }
    }

    /// Compute the cost estimate and hand back the final counters.
    pub fn finish(&mut self) -> CostStats {
        let cost = estimate_cost(&mut self.stats);
        tracing::info!(
            "classification done: {} skipped, {} cache hits, {} new calls, ~${:.4}",
            self.stats.prefilter_skipped,
            self.stats.cache_hits,
            self.stats.new_api_calls,
            cost
        );
        self.stats.clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted extraction service for classifier and pipeline tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    pub struct StubService {
        replies: Mutex<VecDeque<Result<String, AnthropicError>>>,
        pub prompts: Mutex<Vec<String>>,
        model: String,
    }

    impl StubService {
        pub fn new(model: &str) -> Self {
            Self { replies: Mutex::new(VecDeque::new()), prompts: Mutex::new(Vec::new()), model: model.to_string() }
        }

        pub fn reply(&self, text: &str) -> &Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(&self, err: AnthropicError) -> &Self {
            self.replies.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExtractionService for StubService {
        fn model(&self) -> &str {
            &self.model
        }

        async fn extract_deals(&self, text: &str) -> Result<String, AnthropicError> {
            self.prompts.lock().unwrap().push(text.to_string());
            self.replies.lock().unwrap().pop_front().unwrap_or(Err(AnthropicError::EmptyContent))
        }
    }

    pub const KOREA_REPLY: &str = r#"```json
{
  "is_tpd": true,
  "parent": {
    "title": "US-Korea Technology Prosperity Deal",
    "summary": "Bilateral framework on AI, quantum and shipbuilding.",
    "country_code": "KOR",
    "date_signed": "2025-10-29",
    "signatories": ["Donald J. Trump", "Lee Jae-myung"],
    "sectors": ["AI", "6G", "Defense"],
    "total_value_usd": null,
    "status": "ACTIVE"
  },
  "children": [
    {
      "title": "Korean Air Boeing purchase",
      "summary": "Purchase of 103 Boeing aircraft.",
      "parties": ["Korean Air", "Boeing"],
      "deal_value_usd": 36200000000,
      "sector": "Aviation & Defense",
      "commitment_details": "103 aircraft",
      "status": "ACTIVE"
    },
    {
      "title": "AWS cloud investment",
      "summary": "Cloud infrastructure investment through 2031.",
      "parties": ["Amazon Web Services"],
      "deal_value_usd": 5000000000,
      "sector": "Cloud",
      "commitment_details": null,
      "status": "PENDING"
    }
  ]
}
```"#;

    pub const KOREA_TEXT: &str = "Fact Sheet: US-Korea Technology Prosperity Deal\n\
        President Trump and Korean leaders signed a technology prosperity deal.\n\
        - Korean Air: $36.2 billion purchase of 103 Boeing aircraft\n\
        - Amazon AWS: $5 billion cloud investment through 2031";
}
