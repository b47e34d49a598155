use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::cmp::Ordering;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Color for one side of a comparison: the larger weight is green, the
/// smaller red, ties uncolored.
pub fn comparison_color(own: f64, other: f64) -> Option<Color> {
    match own.partial_cmp(&other) {
        Some(Ordering::Greater) => Some(Color::Green),
        Some(Ordering::Less) => Some(Color::Red),
        _ => None,
    }
}

/// Right-aligned numeric cell, blank when `value` is zero.
pub fn amount_cell(value: f64, color: Option<Color>, format_fn: impl Fn(f64) -> String) -> Cell {
    if value == 0.0 {
        return Cell::new("");
    }
    let cell = Cell::new(format_fn(value)).set_alignment(CellAlignment::Right);
    match color {
        Some(color) => cell.fg(color),
        None => cell,
    }
}

/// Creates a spinner for work of unknown length.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_color() {
        assert_eq!(comparison_color(0.2, 0.1), Some(Color::Green));
        assert_eq!(comparison_color(0.1, 0.2), Some(Color::Red));
        assert_eq!(comparison_color(0.1, 0.1), None);
    }

    #[test]
    fn test_amount_cell_blank_for_zero() {
        let cell = amount_cell(0.0, Some(Color::Green), |v| format!("{v}"));
        assert_eq!(cell.content(), "");

        let cell = amount_cell(0.071, None, |v| format!("{:.3}%", v * 100.0));
        assert_eq!(cell.content(), "7.100%");
    }
}
