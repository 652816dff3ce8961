//! Candidate discovery.
//!
//! Listing scrapers are pluggable; anything that yields [`RawCandidate`]s can
//! feed a run. The bundled source reads candidates from JSON files, either a
//! bare array or the `raw_deals` array of a fetch-only output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tpd_core::Error;
use tpd_core::models::{ErrorRecord, RawCandidate};

/// Something that discovers candidate pages.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Name recorded in `sources_scraped` and in error records.
    fn name(&self) -> &str;

    async fn candidates(&self) -> Result<Vec<RawCandidate>, Error>;
}

/// Everything discovered across all sources, in source order.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub candidates: Vec<RawCandidate>,
    pub sources_scraped: Vec<String>,
    pub errors: Vec<ErrorRecord>,
}

/// Query every source; a failing source is recorded and skipped.
pub async fn discover(sources: &[Box<dyn CandidateSource>]) -> Discovery {
    let mut discovery = Discovery::default();

    for source in sources {
        match source.candidates().await {
            Ok(found) => {
                tracing::info!("[{}] found {} candidates", source.name(), found.len());
                discovery.candidates.extend(found);
                discovery.sources_scraped.push(source.name().to_string());
            }
            Err(e) => {
                tracing::error!("[{}] source failed: {}", source.name(), e);
                discovery.errors.push(ErrorRecord::new(source.name(), e));
            }
        }
    }

    discovery
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    List(Vec<RawCandidate>),
    RawOutput { raw_deals: Vec<RawCandidate> },
}

/// Candidates stored in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    /// Source named after the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_stem().map_or_else(|| "candidates".to_string(), |s| s.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn candidates(&self) -> Result<Vec<RawCandidate>, Error> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::InvalidInput(format!("cannot read {}: {e}", self.path.display())))?;

        let file: CandidateFile = serde_json::from_str(&contents).map_err(|e| {
            Error::InvalidInput(format!(
                "{}: expected a candidate array or an object with raw_deals: {e}",
                self.path.display()
            ))
        })?;

        let mut candidates = match file {
            CandidateFile::List(list) => list,
            CandidateFile::RawOutput { raw_deals } => raw_deals,
        };

        for candidate in candidates.iter_mut().filter(|c| c.source_name.is_empty()) {
            candidate.source_name = self.name.clone();
        }

        Ok(candidates)
    }
}
