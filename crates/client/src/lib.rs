//! Network-facing side of the deal tracker.
//!
//! This crate provides the cached fetch pipeline, page text extraction, the
//! Anthropic client, classification and run orchestration used by the CLI.

pub mod anthropic;
pub mod classify;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod source;

pub use anthropic::{AnthropicClient, AnthropicConfig, AnthropicError, ExtractionService};
pub use classify::{Classification, Classifier, ClassifyError, Outcome, Records};
pub use extract::{TextExtractor, html_to_text};
pub use fetch::{FetchRequest, FetchStats, Fetcher, ReqwestTransport, Transport};
pub use pipeline::{Pipeline, Plan};
pub use source::{CandidateSource, Discovery, JsonFileSource, discover};
