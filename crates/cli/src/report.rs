//! Output files and console summaries.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tpd_client::Plan;
use tpd_core::models::{DealsOutput, RawOutput};

pub const DEALS_FILE: &str = "deals.json";
pub const RAW_FILE: &str = "deals.raw.json";

const RULE: &str = "==================================================";

/// Write `value` as pretty JSON to `dir/file_name` via a temp file and rename.
///
/// Readers never observe a partially written file.
pub fn write_json_atomic<T: Serialize>(dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value).context("serializing output")?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;

    let path = dir.join(file_name);
    tmp.persist(&path).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// End-of-run summary.
pub fn summary(output: &DealsOutput, path: &Path) -> String {
    let cost = &output.meta.cost_optimization;
    let errors = match output.meta.errors.len() {
        0 => String::new(),
        n => format!("  Errors:           {n}\n"),
    };

    format!(
        "\n{RULE}\n  Pipeline Complete\n{RULE}\n\
         \x20 Scanned:          {}\n\
         \x20 Processed:        {}\n\
         \x20 Parent TPDs:      {}\n\
         \x20 Child commits:    {}\n\
         \x20 Pre-filter skip:  {}\n\
         \x20 Cache hits:       {}\n\
         \x20 New API calls:    {}\n\
         \x20 Estimated cost:   ${:.4}\n\
         {errors}\
         \x20 Output:           {}\n\
         {RULE}",
        output.meta.deals_scanned,
        output.meta.deals_processed,
        output.parent_count(),
        output.child_count(),
        cost.prefilter_skipped,
        cost.cache_hits,
        cost.new_api_calls,
        cost.estimated_cost_usd,
        path.display()
    )
}

/// Fetch-only summary.
pub fn raw_summary(output: &RawOutput, path: &Path) -> String {
    format!(
        "\nTotal candidates: {}\nFetched:          {}\nErrors:           {}\n--fetch-only: stopped before classification.\nRaw output written to: {}",
        output.meta.deals_scanned,
        output.raw_deals.len(),
        output.meta.errors.len(),
        path.display()
    )
}

/// Dry-run report.
pub fn plan_report(
    plan: &Plan, sources: &[String], countries: &[String], cap: Option<usize>, cached: &[(&str, usize)],
) -> String {
    let cap = cap.map_or_else(|| "none".to_string(), |cap| format!("{cap} candidates"));
    let cache_lines: String =
        cached.iter().map(|(namespace, count)| format!("Cache {namespace}: {count} entries\n")).collect();

    format!(
        "\n--- DRY RUN ---\n\
         Sources:    {}\n\
         Countries:  {}\n\
         Processing cap: {cap}\n\
         Candidates: {} discovered, {} selected\n\
         Pre-filter would skip: {}\n\
         Page text already cached: {}\n\
         Unusable URLs: {}\n\
         {cache_lines}\
         \nNo network requests made. No API calls.",
        sources.join(", "),
        countries.join(", "),
        plan.discovered,
        plan.to_process,
        plan.prefilter_rejects,
        plan.text_cached,
        plan.text_errors
    )
}
