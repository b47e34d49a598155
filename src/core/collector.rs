//! Paginated collection of a fund's holdings

use super::config::PaginationConfig;
use super::error::Error;
use super::holding::{CanonicalDataset, HoldingRecord};
use super::source::HoldingsSource;
use crate::store::DiskCache;
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Cache operation name for a full collection.
pub const COLLECT_OPERATION: &str = "collect_holdings";

/// Pulls every page of `identifier` from `source`.
///
/// Pagination stops once the page index derived from the accumulated row
/// count stops advancing, i.e. after the first short page, or after
/// `max_pages` fetches. A symbol seen twice is a source inconsistency and
/// fails the whole collection.
#[instrument(name = "CollectHoldings", skip_all, fields(identifier = %identifier))]
pub async fn collect(
    source: &dyn HoldingsSource,
    identifier: &str,
    pagination: &PaginationConfig,
) -> Result<CanonicalDataset> {
    pagination.validate()?;
    let page_size = pagination.page_size;
    let mut records: Vec<HoldingRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut last_offset: Option<usize> = None;
    let mut exhausted = false;

    for _ in 0..pagination.max_pages {
        let offset = records.len() / page_size;
        if last_offset == Some(offset) {
            exhausted = true;
            break;
        }

        let page = source
            .fetch_page(identifier, offset)
            .await
            .with_context(|| format!("Failed to fetch page {offset} for {identifier}"))?;

        let page: Vec<HoldingRecord> = page
            .into_iter()
            .map(HoldingRecord::try_from)
            .collect::<Result<_, _>>()?;

        let mut page_symbols = HashSet::with_capacity(page.len());
        let mut duplicates: Vec<String> = page
            .iter()
            .filter(|r| seen.contains(&r.symbol) || !page_symbols.insert(r.symbol.as_str()))
            .map(|r| r.symbol.clone())
            .collect();
        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(Error::DuplicateHoldings {
                identifier: identifier.to_string(),
                offset,
                symbols: duplicates,
            }
            .into());
        }

        debug!("Pulled page {}: {} holdings", offset, page.len());
        seen.extend(page.iter().map(|r| r.symbol.clone()));
        records.extend(page);
        last_offset = Some(offset);
    }

    if !exhausted {
        warn!(
            "Stopped after {} pages for {} with {} holdings",
            pagination.max_pages,
            identifier,
            records.len()
        );
    }

    Ok(CanonicalDataset::new(identifier, records))
}

/// [`collect`] memoized in `cache` as one unit, keyed by the identifier.
pub async fn collect_cached(
    cache: &DiskCache,
    source: &dyn HoldingsSource,
    identifier: &str,
    pagination: &PaginationConfig,
    force_refresh: bool,
) -> Result<CanonicalDataset> {
    cache
        .cached_call(COLLECT_OPERATION, identifier, force_refresh, || {
            collect(source, identifier, pagination)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CacheKey;
    use crate::core::holding::RawHolding;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Serves `total` numbered holdings in pages of `page_size`, recording
    /// every requested offset.
    struct MockSource {
        total: usize,
        page_size: usize,
        repeat_offset: Option<usize>,
        requests: Mutex<Vec<usize>>,
    }

    impl MockSource {
        fn new(total: usize, page_size: usize) -> Self {
            Self {
                total,
                page_size,
                repeat_offset: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<usize> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn holding(index: usize) -> RawHolding {
        RawHolding {
            name: format!("Company {index}"),
            symbol: format!("s{index:03}"),
            weight: "0.5%".to_string(),
            value: "$1,000".to_string(),
        }
    }

    #[async_trait]
    impl HoldingsSource for MockSource {
        async fn fetch_page(&self, _identifier: &str, offset: usize) -> Result<Vec<RawHolding>> {
            self.requests.lock().unwrap().push(offset);
            // Misbehaving sources hand back the previous page again
            let served = match self.repeat_offset {
                Some(repeat) if repeat == offset => offset - 1,
                _ => offset,
            };
            let start = served * self.page_size;
            let end = (start + self.page_size).min(self.total);
            Ok((start..end).map(holding).collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl HoldingsSource for FailingSource {
        async fn fetch_page(&self, _identifier: &str, _offset: usize) -> Result<Vec<RawHolding>> {
            Err(anyhow!("connection reset"))
        }
    }

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            page_size: 20,
            max_pages: 100,
        }
    }

    #[tokio::test]
    async fn test_collect_stops_after_short_page() {
        let source = MockSource::new(45, 20);
        let dataset = collect(&source, "SPY", &pagination()).await.unwrap();

        assert_eq!(source.requests(), vec![0, 1, 2]);
        assert_eq!(dataset.len(), 45);
        assert_eq!(dataset.header.weight, "SPY %");
        assert_eq!(dataset.records[0].symbol, "S000");
        assert_eq!(dataset.records[0].name, "company 0");
        assert_eq!(dataset.records[44].symbol, "S044");
    }

    #[tokio::test]
    async fn test_collect_exact_multiple_fetches_trailing_empty_page() {
        let source = MockSource::new(40, 20);
        let dataset = collect(&source, "SPY", &pagination()).await.unwrap();

        assert_eq!(source.requests(), vec![0, 1, 2]);
        assert_eq!(dataset.len(), 40);
    }

    #[tokio::test]
    async fn test_collect_empty_source() {
        let source = MockSource::new(0, 20);
        let dataset = collect(&source, "EMPTY", &pagination()).await.unwrap();

        assert_eq!(source.requests(), vec![0]);
        assert!(dataset.is_empty());
        assert_eq!(dataset.header.value, "EMPTY Value");
    }

    #[tokio::test]
    async fn test_collect_respects_page_ceiling() {
        let source = MockSource::new(1000, 20);
        let limited = PaginationConfig {
            page_size: 20,
            max_pages: 3,
        };
        let dataset = collect(&source, "BIG", &limited).await.unwrap();

        assert_eq!(source.requests(), vec![0, 1, 2]);
        assert_eq!(dataset.len(), 60);
    }

    #[tokio::test]
    async fn test_collect_cached_zero_limits_fetch_and_store_nothing() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("cache"), WEEK);
        let source = MockSource::new(5, 20);

        for pagination in [
            PaginationConfig {
                page_size: 0,
                max_pages: 100,
            },
            PaginationConfig {
                page_size: 20,
                max_pages: 0,
            },
        ] {
            let err = collect_cached(&cache, &source, "SPY", &pagination, false)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("must be greater than 0"));
        }
        assert!(source.requests().is_empty());
        assert!(!cache.dir().exists());
    }

    #[tokio::test]
    async fn test_collect_detects_repeated_page() {
        let mut source = MockSource::new(100, 20);
        source.repeat_offset = Some(1);

        let err = collect(&source, "SPY", &pagination()).await.unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::DuplicateHoldings {
                identifier,
                offset,
                symbols,
            }) => {
                assert_eq!(identifier, "SPY");
                assert_eq!(*offset, 1);
                assert_eq!(symbols.len(), 20);
                assert_eq!(symbols[0], "S000");
            }
            other => panic!("Expected duplicate holdings error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collect_propagates_fetch_failure() {
        let err = collect(&FailingSource, "SPY", &pagination())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch page 0 for SPY");
        assert_eq!(err.root_cause().to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_collect_cached_second_call_skips_source() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), WEEK);
        let source = MockSource::new(45, 20);

        let first = collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap();
        let second = collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap();

        assert_eq!(source.requests().len(), 3);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_collect_cached_refetches_after_expiration() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        let source = MockSource::new(5, 20);

        collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap();
        let path = cache.entry_path(&CacheKey::new(COLLECT_OPERATION, "SPY").unwrap());
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - Duration::from_secs(120))
            .unwrap();

        collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap();
        assert_eq!(source.requests(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_collect_cached_force_refresh() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), WEEK);
        let source = MockSource::new(5, 20);

        collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap();
        collect_cached(&cache, &source, "SPY", &pagination(), true)
            .await
            .unwrap();
        assert_eq!(source.requests(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_collect_cached_duplicate_writes_nothing() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("cache"), WEEK);
        let mut source = MockSource::new(60, 20);
        source.repeat_offset = Some(1);

        let err = collect_cached(&cache, &source, "SPY", &pagination(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateHoldings { .. })
        ));
        assert!(!cache.dir().exists());
    }

    #[tokio::test]
    async fn test_collect_cached_round_trip() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), WEEK);
        let source = MockSource::new(25, 20);

        let fresh = collect_cached(&cache, &source, "QQQ", &pagination(), false)
            .await
            .unwrap();
        let stored = std::fs::read(
            cache.entry_path(&CacheKey::new(COLLECT_OPERATION, "QQQ").unwrap()),
        )
        .unwrap();
        let restored: CanonicalDataset = serde_json::from_slice(&stored).unwrap();

        assert_eq!(restored, fresh);
        assert_eq!(restored.records[24].weight, 0.005);
        assert_eq!(restored.records[24].value, 1000.0);
        assert_eq!(restored.retrieved_at, fresh.retrieved_at);
    }
}
