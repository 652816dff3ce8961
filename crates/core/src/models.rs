//! Data model for candidates and the pipeline's output document.
//!
//! Parent records are framework deals (`parent_id` is `None`); child records
//! are individual commitments pointing at their parent by id.

use serde::{Deserialize, Serialize};

/// Unclassified page reference produced by discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    pub source_url: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub snippet: String,
    /// Publication date as found on the source, usually `YYYY-MM-DD`.
    #[serde(default)]
    pub raw_date: String,
    /// Source tag, e.g. "whitehouse" or "federal_register".
    #[serde(default)]
    pub source_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealType {
    Government,
    Business,
    Trade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    Active,
    Pending,
    Completed,
    Cancelled,
    Reported,
}

impl DealStatus {
    /// Parse an upper-case status string as emitted by the extraction service.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            "REPORTED" => Some(Self::Reported),
            _ => None,
        }
    }
}

/// Reference to an original source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub label: String,
    pub url: String,
}

/// A classified deal, the unit of pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub source_id: String,
    pub source_url: String,
    pub title: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub deal_type: DealType,
    pub status: DealStatus,
    #[serde(default)]
    pub parties: Vec<String>,
    pub deal_value_usd: Option<i64>,
    pub country: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub date: String,
    pub date_signed: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub signatories: Vec<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    pub commitment_details: Option<String>,
}

impl Deal {
    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A per-item failure surfaced in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub source: String,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(source: impl Into<String>, error: impl ToString) -> Self {
        Self { source: source.into(), error: error.to_string() }
    }
}

/// Per-run cost counters, owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    pub prefilter_enabled: bool,
    pub prefilter_skipped: u64,
    pub truncation_enabled: bool,
    pub model_used: String,
    pub cache_hits: u64,
    pub new_api_calls: u64,
    pub batch_mode: bool,
    pub estimated_cost_usd: f64,
}

impl CostStats {
    pub fn new(model: impl Into<String>, prefilter_enabled: bool, truncation_enabled: bool, batch_mode: bool) -> Self {
        Self {
            prefilter_enabled,
            prefilter_skipped: 0,
            truncation_enabled,
            model_used: model.into(),
            cache_hits: 0,
            new_api_calls: 0,
            batch_mode,
            estimated_cost_usd: 0.0,
        }
    }
}

/// Metadata block of `deals.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// ISO 8601 UTC timestamp.
    pub generated_at: String,
    pub deals_scanned: usize,
    pub deals_processed: usize,
    pub max_items_cap: Option<usize>,
    pub date_range_start: String,
    pub date_range_end: String,
    pub scraper_version: String,
    pub countries_tracked: Vec<String>,
    pub sources_scraped: Vec<String>,
    pub cost_optimization: CostStats,
    pub errors: Vec<ErrorRecord>,
}

/// Top-level shape of `deals.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealsOutput {
    pub meta: RunMeta,
    pub items: Vec<Deal>,
}

impl DealsOutput {
    pub fn parent_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_parent()).count()
    }

    pub fn child_count(&self) -> usize {
        self.items.len() - self.parent_count()
    }
}

/// Metadata block of `deals.raw.json` (fetch-only runs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeta {
    pub generated_at: String,
    pub deals_scanned: usize,
    pub deals_processed: usize,
    pub max_items_cap: Option<usize>,
    pub scraper_version: String,
    pub countries_tracked: Vec<String>,
    pub sources_scraped: Vec<String>,
    pub note: String,
    pub errors: Vec<ErrorRecord>,
}

/// Top-level shape of `deals.raw.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
    pub meta: RawMeta,
    pub raw_deals: Vec<RawCandidate>,
}
