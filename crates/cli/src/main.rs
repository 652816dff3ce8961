//! tpd-tracker entry point.
//!
//! Logging goes to stderr so stdout only carries the run summary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tpd_client::{
    AnthropicClient, CandidateSource, Classifier, Fetcher, JsonFileSource, Pipeline, TextExtractor, discover,
};
use tpd_core::{AppConfig, CacheStore, Namespace};
use tracing_subscriber::EnvFilter;

mod args;
mod report;

use args::Cli;

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn clear_caches(cli: &Cli, store: &CacheStore) -> Result<()> {
    let namespaces: &[Namespace] =
        if cli.clear_all_caches { &Namespace::ALL } else { &[Namespace::Classifications] };

    for ns in namespaces {
        let removed = store.clear(*ns).await?;
        tracing::info!("cleared {} cached {} entries", removed, ns.dir_name());
    }
    Ok(())
}

/// What a run does once candidates are discovered.
enum Mode {
    DryRun,
    FetchOnly,
    Classify(Arc<AnthropicClient>),
}

impl Mode {
    /// Pick the mode, checking credentials when classification will run.
    fn from_cli(cli: &Cli, config: &AppConfig) -> Result<Self> {
        if cli.dry_run {
            return Ok(Mode::DryRun);
        }
        if cli.fetch_only {
            return Ok(Mode::FetchOnly);
        }

        let model = config.resolve_model(cli.model.as_deref());
        let client = AnthropicClient::from_app_config(config, &model).context("cannot classify without an API key")?;
        tracing::info!("classifying with {}", model);
        Ok(Mode::Classify(Arc::new(client)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = AppConfig::load().context("loading configuration")?;
    cli.apply(&mut config);

    if let Some(cap) = config.max_deals {
        tracing::warn!("processing limited to {} candidates", cap);
    }

    let store = CacheStore::new(&config.cache_dir);
    if cli.candidates.is_empty() {
        if cli.clears_cache() {
            return clear_caches(&cli, &store).await;
        }
        anyhow::bail!("no candidate files given; pass --candidates <PATH>");
    }

    // credentials are checked before any cache is cleared or page fetched
    let mode = Mode::from_cli(&cli, &config)?;
    if cli.clears_cache() {
        clear_caches(&cli, &store).await?;
    }

    let fetcher = Fetcher::with_reqwest(&config, store.clone())?;
    let mut pipeline = Pipeline::new(&config, TextExtractor::new(Arc::new(fetcher)));
    if let Some(country) = &cli.country {
        pipeline = pipeline.for_country(country)?;
    }

    let sources: Vec<Box<dyn CandidateSource>> =
        cli.candidates.iter().map(|path| Box::new(JsonFileSource::new(path)) as Box<dyn CandidateSource>).collect();
    let discovery = discover(&sources).await;
    println!("Total candidates discovered: {}", discovery.candidates.len());

    match mode {
        Mode::DryRun => {
            let plan = pipeline.plan(&discovery.candidates).await;
            let mut cached = Vec::new();
            for ns in Namespace::ALL {
                cached.push((ns.dir_name(), store.entry_count(ns).await?));
            }
            println!(
                "{}",
                report::plan_report(
                    &plan,
                    &discovery.sources_scraped,
                    &pipeline.countries_tracked(),
                    config.max_deals,
                    &cached
                )
            );
        }
        Mode::FetchOnly => {
            let raw = pipeline.warm(discovery).await;
            let path = report::write_json_atomic(&config.data_dir, report::RAW_FILE, &raw)?;
            println!("{}", report::raw_summary(&raw, &path));
        }
        Mode::Classify(client) => {
            let mut classifier = Classifier::new(&config, store, client);
            let output = pipeline.run(&mut classifier, discovery).await;

            let path = report::write_json_atomic(&config.data_dir, report::DEALS_FILE, &output)?;
            println!("{}", report::summary(&output, &path));
        }
    }

    Ok(())
}
