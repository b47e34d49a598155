pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::compare::CompareOptions;
use crate::core::config::AppConfig;
use crate::core::holding::normalize_identifier;
use crate::core::{CanonicalDataset, MergedDataset, collect_cached, reconcile};
use crate::providers::EtfChannelProvider;
use crate::store::DiskCache;
use anyhow::{Context, Result};
use futures::future::try_join;
use tracing::{debug, info};

pub enum AppCommand {
    Compare(CompareOptions),
    ClearCache,
}

/// Both funds' holdings and their merged view.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub first: CanonicalDataset,
    pub second: CanonicalDataset,
    pub merged: MergedDataset,
}

pub fn cache_from_config(config: &AppConfig) -> Result<DiskCache> {
    Ok(DiskCache::new(
        config.cache_path()?,
        config.cache.expiration(),
    ))
}

/// Collects the holdings of both funds, through the cache, and merges them.
///
/// Each fund gets its own provider and HTTP client; the two collections run
/// concurrently. Identifiers are trimmed and uppercased first.
pub async fn compare_funds(
    config: &AppConfig,
    first: &str,
    second: &str,
    force_refresh: bool,
) -> Result<Comparison> {
    let first = normalize_identifier(first)?;
    let second = normalize_identifier(second)?;
    config.validate()?;

    let cache = cache_from_config(config)?;
    debug!("Using cache at {}", cache.dir().display());

    let page_size = config.pagination.page_size;
    let first_source = EtfChannelProvider::new(&config.providers.etfchannel, page_size)?;
    let second_source = EtfChannelProvider::new(&config.providers.etfchannel, page_size)?;

    let (first, second) = try_join(
        async {
            collect_cached(&cache, &first_source, &first, &config.pagination, force_refresh)
                .await
                .with_context(|| format!("Failed to collect holdings for {first}"))
        },
        async {
            collect_cached(&cache, &second_source, &second, &config.pagination, force_refresh)
                .await
                .with_context(|| format!("Failed to collect holdings for {second}"))
        },
    )
    .await?;

    let merged = reconcile(&first, &second);
    Ok(Comparison {
        first,
        second,
        merged,
    })
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ETF comparison starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Compare(options) => cli::compare::run(&config, &options).await,
        AppCommand::ClearCache => {
            let cache = cache_from_config(&config)?;
            let removed = cache.clear()?;
            println!(
                "Removed {} cached entries from {}",
                removed,
                cache.dir().display()
            );
            Ok(())
        }
    }
}
