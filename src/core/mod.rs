//! Core retrieval, caching and reconciliation logic

pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod holding;
pub mod log;
pub mod reconcile;
pub mod source;

// Re-export main types for cleaner imports
pub use collector::{collect, collect_cached};
pub use error::Error;
pub use holding::{CanonicalDataset, HoldingRecord, RawHolding};
pub use reconcile::{MergedDataset, MergedRecord, OverlapSummary, overlap_summary, reconcile};
pub use source::HoldingsSource;
