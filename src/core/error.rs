//! Domain errors raised by the retrieval and caching layers

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Duplicate holdings for {identifier} on page {offset}: {}", symbols.join(", "))]
    DuplicateHoldings {
        identifier: String,
        offset: usize,
        symbols: Vec<String>,
    },

    #[error("Page {offset} for {identifier} has {symbols} symbols but {rows} rows")]
    RecordCountMismatch {
        identifier: String,
        offset: usize,
        symbols: usize,
        rows: usize,
    },

    #[error("Malformed holding '{symbol}': {reason}")]
    MalformedHolding { symbol: String, reason: String },

    #[error("Found {found} holdings tables for {identifier} on page {offset}, expected 1")]
    HoldingsTableNotFound {
        identifier: String,
        offset: usize,
        found: usize,
    },

    #[error("Corrupt cache entry at {}", path.display())]
    CorruptCacheEntry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid fund identifier: '{0}'")]
    InvalidIdentifier(String),
}
