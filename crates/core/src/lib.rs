//! Core types and shared functionality for the deal tracker.
//!
//! This crate provides:
//! - File-backed, content-addressed cache store
//! - Unified error types
//! - Configuration structures
//! - Output data model and cost accounting
//! - Zero-cost text gates (pre-filter, truncation)

pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod models;
pub mod text;

pub use cache::{CacheKey, CacheStore, Namespace};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
