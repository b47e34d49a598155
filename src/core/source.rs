//! Holdings source abstraction

use super::holding::RawHolding;
use anyhow::Result;
use async_trait::async_trait;

/// A remote listing of fund holdings, served one page at a time.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    /// Returns the rows on page `offset` (zero based) for `identifier`.
    /// An exhausted listing yields a short or empty page.
    async fn fetch_page(&self, identifier: &str, offset: usize) -> Result<Vec<RawHolding>>;
}
