//! Run orchestration.
//!
//! One candidate at a time, in discovery order:
//! pre-filter on title and snippet, page text (cached, fetched on a miss,
//! else title plus snippet), classification, parent dedup by country.
//! Per-item failures become [`ErrorRecord`]s; nothing short of bad
//! configuration stops a run.

use chrono::Utc;
use tpd_core::config::{CountryWatch, SCRAPER_VERSION};
use tpd_core::models::{Deal, DealsOutput, ErrorRecord, RawCandidate, RawMeta, RawOutput, RunMeta};
use tpd_core::text::{Prefilter, matches_watchlist};
use tpd_core::{AppConfig, Error};

use crate::classify::{Classifier, Outcome, Records};
use crate::extract::TextExtractor;
use crate::source::Discovery;

/// Earliest date covered by the tracker.
pub const DATE_RANGE_START: &str = "2025-01-01";

const RAW_NOTE: &str = "Raw unclassified output; classification not run";

/// What a dry run would do, computed without network or paid calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub discovered: usize,
    pub to_process: usize,
    pub prefilter_rejects: usize,
    /// Candidates whose page text is already in the cache.
    pub text_cached: usize,
    /// Candidates whose cache entry could not be looked up (e.g. unusable URL).
    pub text_errors: usize,
}

/// Drives extraction and classification over discovered candidates.
pub struct Pipeline {
    config: AppConfig,
    extractor: TextExtractor,
    country: Option<CountryWatch>,
}

impl Pipeline {
    pub fn new(config: &AppConfig, extractor: TextExtractor) -> Self {
        Self { config: config.clone(), extractor, country: None }
    }

    /// Restrict the run to one watched country (by its key, e.g. `"Japan"`).
    pub fn for_country(mut self, key: &str) -> Result<Self, Error> {
        let watch = self.config.country(key).cloned().ok_or_else(|| {
            let available: Vec<_> = self.config.countries.iter().map(|c| c.key.as_str()).collect();
            Error::InvalidInput(format!("unknown country '{key}'; available: {}", available.join(", ")))
        })?;
        self.country = Some(watch);
        Ok(self)
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    /// Country codes recorded in the output metadata.
    pub fn countries_tracked(&self) -> Vec<String> {
        match &self.country {
            Some(watch) => vec![watch.code.clone()],
            None => self.config.countries.iter().map(|c| c.code.clone()).collect(),
        }
    }

    /// Candidates after the country narrowing and the processing cap.
    pub fn select<'a>(&self, candidates: &'a [RawCandidate]) -> Vec<&'a RawCandidate> {
        let keywords = self.config.prefilter_keywords();
        let narrowed = candidates.iter().filter(|c| match &self.country {
            Some(watch) => matches_watchlist(&c.title, &self.config.countries, Some(watch), &keywords),
            None => true,
        });

        match self.config.max_deals {
            Some(cap) => narrowed.take(cap).collect(),
            None => narrowed.collect(),
        }
    }

    /// Classify every selected candidate and assemble the output document.
    pub async fn run(&self, classifier: &mut Classifier, discovery: Discovery) -> DealsOutput {
        let Discovery { candidates, sources_scraped, mut errors } = discovery;
        let selected = self.select(&candidates);
        if let Some(cap) = self.config.max_deals {
            tracing::info!("processing {} of {} candidates (cap {})", selected.len(), candidates.len(), cap);
        }

        let mut items: Vec<Deal> = Vec::new();
        let mut counter: u64 = 0;

        for candidate in selected {
            counter += 1;

            if !classifier.admit(candidate) {
                continue;
            }

            let text = self.page_text(candidate, &mut errors).await;

            match classifier.classify_admitted(candidate, &text, counter).await {
                Ok(Outcome::Extracted(records)) => {
                    for reason in &records.rejected {
                        errors.push(ErrorRecord::new(&candidate.source_url, reason));
                    }
                    merge_records(&mut items, records);
                }
                Ok(Outcome::NotRelevant) | Ok(Outcome::Skipped) => {}
                Err(e) => {
                    tracing::error!(
                        "classification failed for '{}': {}",
                        candidate.title.chars().take(50).collect::<String>(),
                        e
                    );
                    errors.push(ErrorRecord::new(&candidate.source_url, e));
                }
            }
        }

        let cost = classifier.finish();
        let now = Utc::now();

        DealsOutput {
            meta: RunMeta {
                generated_at: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                deals_scanned: candidates.len(),
                deals_processed: items.len(),
                max_items_cap: self.config.max_deals,
                date_range_start: DATE_RANGE_START.to_string(),
                date_range_end: now.format("%Y-%m-%d").to_string(),
                scraper_version: SCRAPER_VERSION.to_string(),
                countries_tracked: self.countries_tracked(),
                sources_scraped,
                cost_optimization: cost,
                errors,
            },
            items,
        }
    }

    /// Fetch and extract every selected candidate so later runs hit the cache.
    pub async fn warm(&self, discovery: Discovery) -> RawOutput {
        let Discovery { candidates, sources_scraped, mut errors } = discovery;
        let selected: Vec<RawCandidate> = self.select(&candidates).into_iter().cloned().collect();

        for candidate in &selected {
            match self.extractor.extract(&candidate.source_url).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    errors.push(ErrorRecord::new(&candidate.source_url, "no content"));
                }
                Err(e) => {
                    tracing::error!("failed to warm {}: {}", candidate.source_url, e);
                    errors.push(ErrorRecord::new(&candidate.source_url, e));
                }
            }
        }

        RawOutput {
            meta: RawMeta {
                generated_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                deals_scanned: candidates.len(),
                deals_processed: 0,
                max_items_cap: self.config.max_deals,
                scraper_version: SCRAPER_VERSION.to_string(),
                countries_tracked: self.countries_tracked(),
                sources_scraped,
                note: RAW_NOTE.to_string(),
                errors,
            },
            raw_deals: selected,
        }
    }

    /// Dry-run report: reads the cache only.
    ///
    /// A candidate whose cache entry cannot be read is counted in
    /// `text_errors` and does not stop the report.
    pub async fn plan(&self, candidates: &[RawCandidate]) -> Plan {
        let selected = self.select(candidates);
        let prefilter = Prefilter::from_config(&self.config);

        let mut prefilter_rejects = 0;
        let mut text_cached = 0;
        let mut text_errors = 0;
        for candidate in &selected {
            if !prefilter.passes(&candidate.title, &candidate.snippet) {
                prefilter_rejects += 1;
            }
            match self.extractor.extract_cached(&candidate.source_url).await {
                Ok(Some(_)) => text_cached += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("cannot look up cached text for {}: {}", candidate.source_url, e);
                    text_errors += 1;
                }
            }
        }

        Plan { discovered: candidates.len(), to_process: selected.len(), prefilter_rejects, text_cached, text_errors }
    }

    /// Extracted page text, or title and snippet when the page has none.
    ///
    /// A page that could not be fetched or extracted is recorded in `errors`;
    /// the candidate is still classified from its snippet.
    async fn page_text(&self, candidate: &RawCandidate, errors: &mut Vec<ErrorRecord>) -> String {
        match self.extractor.extract(&candidate.source_url).await {
            Ok(Some(text)) if !text.trim().is_empty() => return text,
            Ok(Some(_)) => tracing::debug!("empty page text for {}, using snippet", candidate.source_url),
            Ok(None) => {
                tracing::warn!("no content for {}, using snippet", candidate.source_url);
                errors.push(ErrorRecord::new(&candidate.source_url, "no content"));
            }
            Err(e) => {
                tracing::warn!("text extraction failed for {}: {}", candidate.source_url, e);
                errors.push(ErrorRecord::new(&candidate.source_url, e));
            }
        }
        format!("{}\n\n{}", candidate.title, candidate.snippet)
    }
}

/// Add one candidate's records, keeping a single parent per country.
///
/// A repeated parent folds its source documents into the first one and its
/// children are re-pointed at that parent. Children whose parent could not be
/// built attach to an existing parent for the country, or are dropped.
fn merge_records(items: &mut Vec<Deal>, records: Records) {
    let Records { parent, children, .. } = records;
    let country = parent.as_ref().map(|p| p.country.clone()).or_else(|| children.first().map(|c| c.country.clone()));
    let Some(country) = country else {
        return;
    };

    let existing = items.iter_mut().find(|d| d.is_parent() && d.country == country);

    let parent_id = match (existing, parent) {
        (Some(first), Some(repeat)) => {
            tracing::debug!("merging parent {} into {}", repeat.id, first.id);
            first.source_documents.extend(repeat.source_documents);
            first.id.clone()
        }
        (Some(first), None) => first.id.clone(),
        (None, Some(parent)) => {
            let id = parent.id.clone();
            items.push(parent);
            id
        }
        (None, None) => {
            tracing::warn!("dropping {} children with no parent for {}", children.len(), country);
            return;
        }
    };

    items.extend(children.into_iter().map(|mut child| {
        child.parent_id = Some(parent_id.clone());
        child
    }));
}
