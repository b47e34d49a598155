use crate::core::config::EtfChannelConfig;
use crate::core::error::Error;
use crate::core::{HoldingsSource, RawHolding};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::COOKIE;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

/// Session cookies the listing pages expect before serving holdings.
const SESSION_COOKIES: &str = "slogin=1700761901; coregval=ims";
const HOLDINGS_MARKER: &str = "Stock Holdings Page";

/// Scrapes the paged stock-holdings listing of etfchannel.com.
///
/// Each provider owns its own HTTP client, so callers comparing two funds
/// should create one provider per fund.
pub struct EtfChannelProvider {
    base_url: String,
    page_size: usize,
    client: reqwest::Client,
}

impl EtfChannelProvider {
    pub fn new(config: &EtfChannelConfig, page_size: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfc/0.1")
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size,
            client,
        })
    }

    /// Listing URL for one page. The identifier is percent-encoded.
    fn page_url(&self, identifier: &str, offset: usize) -> Result<Url> {
        let page_size = self.page_size.to_string();
        let offset = offset.to_string();
        let url = Url::parse_with_params(
            &format!("{}/lists/", self.base_url),
            [
                ("a", "stockholdings"),
                ("issuer", ""),
                ("symbol", identifier),
                ("sortby", ""),
                ("reverse", ""),
                ("rpp", page_size.as_str()),
                ("start", offset.as_str()),
            ],
        )
        .with_context(|| format!("Invalid listing URL for base {}", self.base_url))?;
        Ok(url)
    }
}

#[async_trait]
impl HoldingsSource for EtfChannelProvider {
    #[instrument(name = "EtfChannelFetch", skip_all, fields(identifier = %identifier, offset = offset))]
    async fn fetch_page(&self, identifier: &str, offset: usize) -> Result<Vec<RawHolding>> {
        let url = self.page_url(identifier, offset)?;
        debug!("Requesting holdings from {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(COOKIE, SESSION_COOKIES)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for fund: {} URL: {}", e, identifier, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for fund: {} page: {}",
                response.status(),
                identifier,
                offset
            ));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for fund: {identifier}"))?;

        let rows = parse_holdings_page(&body, identifier, offset)?;
        debug!("Parsed {} holdings from {}", rows.len(), url);
        Ok(rows)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{css}': {e:?}"))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Extracts the holdings rows from one listing page.
///
/// The page has no ids or classes to anchor on. The holdings sit in a
/// nested table inside the single fixed-width (420) table whose text names
/// both the fund and the "Stock Holdings Page" caption. Every row with
/// exactly three cells is `company, percent, value`; the ticker is the last
/// path segment of the company link, or the company text when unlinked.
pub fn parse_holdings_page(html: &str, identifier: &str, offset: usize) -> Result<Vec<RawHolding>> {
    let document = Html::parse_document(html);
    let outer = selector(r#"table[width="420"]"#)?;
    let table = selector("table")?;
    let row = selector("tr")?;
    let cell = selector("td")?;
    let link = selector("a[href]")?;

    let not_found = |found: usize| Error::HoldingsTableNotFound {
        identifier: identifier.to_string(),
        offset,
        found,
    };

    let candidates: Vec<ElementRef<'_>> = document.select(&outer).collect();
    if candidates.is_empty() {
        return Err(not_found(0).into());
    }

    let matching: Vec<ElementRef<'_>> = candidates
        .into_iter()
        .filter(|t| {
            let text = text_of(*t);
            text.contains(HOLDINGS_MARKER) && text.contains(identifier)
        })
        .filter_map(|t| t.select(&table).next())
        .collect();
    let [holdings] = matching.as_slice() else {
        return Err(not_found(matching.len()).into());
    };

    let rows: Vec<Vec<ElementRef<'_>>> = holdings
        .select(&row)
        .map(|r| r.select(&cell).collect::<Vec<_>>())
        .filter(|cells| cells.len() == 3)
        .collect();

    // Rows whose ticker cannot be resolved are dropped here and caught by
    // the count check below
    let symbols: Vec<String> = rows
        .iter()
        .filter_map(|cells| {
            cells[0]
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| href.trim_end_matches('/').rsplit('/').next())
                .map(str::to_string)
                .or_else(|| Some(text_of(cells[0])))
                .filter(|s| !s.trim().is_empty())
        })
        .collect();

    if symbols.len() != rows.len() {
        return Err(Error::RecordCountMismatch {
            identifier: identifier.to_string(),
            offset,
            symbols: symbols.len(),
            rows: rows.len(),
        }
        .into());
    }

    Ok(symbols
        .into_iter()
        .zip(rows)
        .map(|(symbol, cells)| RawHolding {
            name: text_of(cells[0]),
            symbol,
            weight: text_of(cells[1]),
            value: text_of(cells[2]),
        })
        .collect())
}
