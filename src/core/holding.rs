//! Holding records and the per-fund canonical dataset

use super::error::Error;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A holding row exactly as the source reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHolding {
    pub name: String,
    pub symbol: String,
    /// Percentage text, e.g. `7.10%`
    pub weight: String,
    /// Currency text, e.g. `$1,234,567`
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub name: String,
    pub symbol: String,
    /// Fraction of the fund, in `[0, 1]`
    pub weight: f64,
    pub value: f64,
}

impl TryFrom<RawHolding> for HoldingRecord {
    type Error = Error;

    fn try_from(raw: RawHolding) -> Result<Self, Self::Error> {
        let symbol = raw.symbol.trim().to_uppercase();
        let malformed = |reason: String| Error::MalformedHolding {
            symbol: symbol.clone(),
            reason,
        };

        if symbol.is_empty() {
            return Err(malformed("empty symbol".to_string()));
        }

        let weight = parse_percentage(&raw.weight).map_err(|e| malformed(e.to_string()))?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(malformed(format!("weight {weight} out of range")));
        }

        let value = parse_dollar(&raw.value).map_err(|e| malformed(e.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(malformed(format!("value {value} out of range")));
        }

        Ok(HoldingRecord {
            name: raw.name.trim().to_lowercase(),
            symbol,
            weight,
            value,
        })
    }
}

/// Parses `"7.10%"` into `0.071`. The division happens in decimal space so
/// that the textual digits survive into the float unchanged.
pub fn parse_percentage(pct: &str) -> Result<f64> {
    let digits = pct.trim().trim_end_matches('%').trim();
    let fraction = Decimal::from_str(digits)? / Decimal::ONE_HUNDRED;
    fraction
        .to_f64()
        .ok_or_else(|| anyhow::anyhow!("Percentage out of range: {pct}"))
}

/// Parses `"$1,234.5"` into `1234.5`. Whitespace around or after the
/// currency sign is ignored.
pub fn parse_dollar(usd: &str) -> Result<f64> {
    let digits: String = usd
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    Ok(digits.parse::<f64>()?)
}

/// Trims and uppercases a fund ticker, rejecting blank input.
pub fn normalize_identifier(identifier: &str) -> Result<String, Error> {
    let normalized = identifier.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(Error::InvalidIdentifier(identifier.to_string()));
    }
    Ok(normalized)
}

/// Column labels heading a canonical dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetHeader {
    pub name: String,
    pub symbol: String,
    pub weight: String,
    pub value: String,
}

impl DatasetHeader {
    pub fn for_identifier(identifier: &str) -> Self {
        Self {
            name: "Company".to_string(),
            symbol: "Ticker".to_string(),
            weight: format!("{identifier} %"),
            value: format!("{identifier} Value"),
        }
    }
}

/// Every holding of one fund, in source order, with unique symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDataset {
    pub identifier: String,
    pub header: DatasetHeader,
    pub records: Vec<HoldingRecord>,
    pub retrieved_at: DateTime<Utc>,
}

impl CanonicalDataset {
    pub fn new(identifier: &str, records: Vec<HoldingRecord>) -> Self {
        Self {
            identifier: identifier.to_string(),
            header: DatasetHeader::for_identifier(identifier),
            records,
            retrieved_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
