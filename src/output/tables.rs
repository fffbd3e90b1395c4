use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Green up to three days, yellow up to a week, red beyond.
pub fn color_coded_days_cell(days: Option<i64>) -> Cell {
    match days {
        None => Cell::new("N/A").fg(TableColor::DarkGrey),
        Some(days) if days <= 3 => Cell::new(format!("{days}d")).fg(TableColor::Green),
        Some(days) if days <= 7 => Cell::new(format!("{days}d")).fg(TableColor::Yellow),
        Some(days) => Cell::new(format!("{days}d")).fg(TableColor::Red),
    }
}
