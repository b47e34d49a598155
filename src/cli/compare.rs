use super::ui;
use crate::core::config::AppConfig;
use crate::core::{CanonicalDataset, MergedDataset, MergedRecord, overlap_summary};
use crate::{Comparison, compare_funds};
use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{Cell, Table};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    /// Largest weight in the first fund first
    #[default]
    First,
    /// Largest weight in the second fund first
    Second,
    /// Company name, A to Z
    Name,
}

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub first: String,
    pub second: String,
    pub sort: SortOrder,
    pub overlap_only: bool,
    pub refresh: bool,
}

pub async fn run(config: &AppConfig, options: &CompareOptions) -> Result<()> {
    let pb = ui::new_spinner(&format!(
        "Fetching holdings for {} and {}...",
        options.first, options.second
    ));
    let comparison = compare_funds(config, &options.first, &options.second, options.refresh).await;
    pb.finish_and_clear();
    let comparison = comparison?;

    info!(
        "Compared {} holdings",
        comparison.merged.records.len()
    );

    println!(
        "\n{}\n",
        ui::style_text(
            &format!("{} vs {}", comparison.first.identifier, comparison.second.identifier),
            ui::StyleType::Title
        )
    );
    println!(
        "{}",
        build_table(&comparison.merged, options.sort, options.overlap_only)
    );
    display_summary(&comparison);
    Ok(())
}

/// Rows of `merged` in display order, optionally limited to holdings with
/// every field non-zero.
pub fn sorted_rows(merged: &MergedDataset, sort: SortOrder, overlap_only: bool) -> Vec<&MergedRecord> {
    let mut rows: Vec<&MergedRecord> = merged
        .records
        .iter()
        .filter(|r| !overlap_only || r.is_complete())
        .collect();

    match sort {
        SortOrder::First => rows.sort_by(|a, b| b.weight1.total_cmp(&a.weight1)),
        SortOrder::Second => rows.sort_by(|a, b| b.weight2.total_cmp(&a.weight2)),
        SortOrder::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
    }
    rows
}

fn build_table(merged: &MergedDataset, sort: SortOrder, overlap_only: bool) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(merged.header.labels().map(ui::header_cell));

    let percent = |w: f64| format!("{:.3}%", w * 100.0);
    let dollars = |v: f64| format!("${v:.0}");

    for record in sorted_rows(merged, sort, overlap_only) {
        let first_color = ui::comparison_color(record.weight1, record.weight2);
        let second_color = ui::comparison_color(record.weight2, record.weight1);
        table.add_row(vec![
            Cell::new(&record.symbol),
            Cell::new(&record.name),
            ui::amount_cell(record.weight1, first_color, percent),
            ui::amount_cell(record.value1, first_color, dollars),
            ui::amount_cell(record.weight2, second_color, percent),
            ui::amount_cell(record.value2, second_color, dollars),
        ]);
    }
    table
}

fn describe(dataset: &CanonicalDataset) -> String {
    format!(
        "{}: {} holdings {}",
        dataset.identifier,
        dataset.len(),
        ui::style_text(
            &format!("(as of {})", dataset.retrieved_at.format("%Y-%m-%d %H:%M UTC")),
            ui::StyleType::Subtle
        )
    )
}

fn display_summary(comparison: &Comparison) {
    let summary = overlap_summary(&comparison.merged);

    println!("\n{}", ui::style_text("Summary", ui::StyleType::Title));
    println!("  {}", describe(&comparison.first));
    println!("  {}", describe(&comparison.second));
    println!(
        "  {} {} holdings, {:.2}% of {}, {:.2}% of {}",
        ui::style_text("Overlap:", ui::StyleType::TotalLabel),
        ui::style_text(&summary.overlapping.to_string(), ui::StyleType::TotalValue),
        summary.first_overlap_weight * 100.0,
        comparison.first.identifier,
        summary.second_overlap_weight * 100.0,
        comparison.second.identifier,
    );
    println!(
        "  Only in {}: {}, only in {}: {}\n",
        comparison.first.identifier,
        summary.first_only,
        comparison.second.identifier,
        summary.second_only
    );
}
