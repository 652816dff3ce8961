//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use tpd_core::AppConfig;

/// Tech Prosperity Deal tracker.
///
/// Fetches candidate pages, extracts their text and classifies them into
/// parent agreements and child commitments, spending as little as possible on
/// paid calls.
#[derive(Parser, Debug)]
#[command(name = "tpd-tracker")]
#[command(version)]
#[command(about = "Track US bilateral technology deals", long_about = None)]
pub struct Cli {
    /// JSON file of candidates (array, or an object with `raw_deals`). Repeatable.
    #[arg(long = "candidates", value_name = "PATH")]
    pub candidates: Vec<PathBuf>,

    /// List what would be processed. No downloads, no API calls.
    #[arg(long, conflicts_with = "fetch_only")]
    pub dry_run: bool,

    /// Fetch and cache pages only. No classification.
    #[arg(long)]
    pub fetch_only: bool,

    /// Restrict to one watched country (e.g. "UK", "Japan", "South Korea").
    #[arg(long)]
    pub country: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,

    /// Disable keyword pre-filtering.
    #[arg(long)]
    pub no_prefilter: bool,

    /// Send full page text instead of truncating it.
    #[arg(long)]
    pub full_text: bool,

    /// Model override; "premium" selects the premium model.
    #[arg(long)]
    pub model: Option<String>,

    /// Price calls at the batch discount.
    #[arg(long)]
    pub batch: bool,

    /// Delete cached classifications before running.
    #[arg(long)]
    pub clear_cache: bool,

    /// Delete cached pages, extracted text and classifications before running.
    #[arg(long)]
    pub clear_all_caches: bool,

    /// Output directory (defaults to the configured data directory).
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line toggles on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if self.no_prefilter {
            config.prefilter_enabled = false;
        }
        if self.full_text {
            config.truncation_enabled = false;
        }
        if self.batch {
            config.batch_mode = true;
        }
        if let Some(dir) = &self.output {
            config.data_dir = dir.clone();
        }
    }

    pub fn clears_cache(&self) -> bool {
        self.clear_cache || self.clear_all_caches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["tpd-tracker", "--candidates", "wh.json"]).unwrap();
        assert_eq!(cli.candidates, vec![PathBuf::from("wh.json")]);
        assert!(!cli.dry_run);
        assert!(!cli.fetch_only);
        assert!(cli.model.is_none());
    }

    #[test]
    fn test_parse_repeated_candidates_and_flags() {
        let cli = Cli::try_parse_from([
            "tpd-tracker",
            "--candidates",
            "a.json",
            "--candidates",
            "b.json",
            "--country",
            "South Korea",
            "--model",
            "premium",
            "--no-prefilter",
            "--full-text",
            "--batch",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.candidates.len(), 2);
        assert_eq!(cli.country.as_deref(), Some("South Korea"));
        assert_eq!(cli.model.as_deref(), Some("premium"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_dry_run_conflicts_with_fetch_only() {
        assert!(Cli::try_parse_from(["tpd-tracker", "--dry-run", "--fetch-only"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from(["tpd-tracker", "--no-prefilter", "--full-text", "--batch", "--output", "out"])
            .unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert!(!config.prefilter_enabled);
        assert!(!config.truncation_enabled);
        assert!(config.batch_mode);
        assert_eq!(config.data_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_clears_cache() {
        let cli = Cli::try_parse_from(["tpd-tracker", "--clear-all-caches"]).unwrap();
        assert!(cli.clears_cache());
    }
}
