//! Outer join of two funds' holdings

use super::holding::{CanonicalDataset, HoldingRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub symbol: String,
    pub name: String,
    pub weight1: f64,
    pub value1: f64,
    pub weight2: f64,
    pub value2: f64,
}

impl MergedRecord {
    /// Held with a non-zero weight by both funds.
    pub fn is_overlap(&self) -> bool {
        self.weight1 != 0.0 && self.weight2 != 0.0
    }

    /// Every numeric field is non-zero.
    pub fn is_complete(&self) -> bool {
        self.is_overlap() && self.value1 != 0.0 && self.value2 != 0.0
    }
}

/// `Ticker, Company, <A> %, <A> Value, <B> %, <B> Value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedHeader {
    pub symbol: String,
    pub name: String,
    pub weight1: String,
    pub value1: String,
    pub weight2: String,
    pub value2: String,
}

impl MergedHeader {
    pub fn labels(&self) -> [&str; 6] {
        [
            self.symbol.as_str(),
            self.name.as_str(),
            self.weight1.as_str(),
            self.value1.as_str(),
            self.weight2.as_str(),
            self.value2.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDataset {
    pub first: String,
    pub second: String,
    pub header: MergedHeader,
    pub records: Vec<MergedRecord>,
}

/// Full outer join of `a` and `b` on symbol.
///
/// Rows follow `a`'s order, then the symbols only `b` holds in `b`'s order.
/// A side without the symbol contributes zero weight and value. The name
/// comes from `a` unless it is empty there.
pub fn reconcile(a: &CanonicalDataset, b: &CanonicalDataset) -> MergedDataset {
    let right: HashMap<&str, &HoldingRecord> = b
        .records
        .iter()
        .rev()
        .map(|r| (r.symbol.as_str(), r))
        .collect();

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut records = Vec::with_capacity(a.len() + b.len());

    for left in &a.records {
        if !emitted.insert(left.symbol.as_str()) {
            continue;
        }
        let other = right.get(left.symbol.as_str()).copied();
        records.push(MergedRecord {
            symbol: left.symbol.clone(),
            name: if left.name.is_empty() {
                other.map(|r| r.name.clone()).unwrap_or_default()
            } else {
                left.name.clone()
            },
            weight1: left.weight,
            value1: left.value,
            weight2: other.map_or(0.0, |r| r.weight),
            value2: other.map_or(0.0, |r| r.value),
        });
    }

    for only_right in &b.records {
        if !emitted.insert(only_right.symbol.as_str()) {
            continue;
        }
        records.push(MergedRecord {
            symbol: only_right.symbol.clone(),
            name: only_right.name.clone(),
            weight1: 0.0,
            value1: 0.0,
            weight2: only_right.weight,
            value2: only_right.value,
        });
    }

    MergedDataset {
        first: a.identifier.clone(),
        second: b.identifier.clone(),
        header: MergedHeader {
            symbol: a.header.symbol.clone(),
            name: a.header.name.clone(),
            weight1: a.header.weight.clone(),
            value1: a.header.value.clone(),
            weight2: b.header.weight.clone(),
            value2: b.header.value.clone(),
        },
        records,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlapSummary {
    pub first_total: usize,
    pub second_total: usize,
    pub overlapping: usize,
    pub first_only: usize,
    pub second_only: usize,
    /// Share of the first fund held in overlapping positions
    pub first_overlap_weight: f64,
    pub second_overlap_weight: f64,
}

/// Counts the holdings each fund has, the ones both hold with a non-zero
/// weight, and how much of each fund those shared holdings make up.
pub fn overlap_summary(merged: &MergedDataset) -> OverlapSummary {
    merged
        .records
        .iter()
        .fold(OverlapSummary::default(), |mut summary, record| {
            let in_first = record.weight1 != 0.0;
            let in_second = record.weight2 != 0.0;
            summary.first_total += usize::from(in_first);
            summary.second_total += usize::from(in_second);
            match (in_first, in_second) {
                (true, true) => {
                    summary.overlapping += 1;
                    summary.first_overlap_weight += record.weight1;
                    summary.second_overlap_weight += record.weight2;
                }
                (true, false) => summary.first_only += 1,
                (false, true) => summary.second_only += 1,
                (false, false) => {}
            }
            summary
        })
}
