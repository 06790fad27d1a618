use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::ExportSummary;

pub fn print_summary(summary: &ExportSummary) {
    let result = &summary.result;
    println!("Form: {}", result.form);
    println!("Output: {} ({})", summary.destination.display(), summary.format);
    println!("Submissions: {}", result.submissions);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Section"),
        header_cell("Sheet"),
        header_cell("Rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (section, sheet, rows) in &result.sections {
        table.add_row(vec![
            Cell::new(section),
            Cell::new(sheet),
            count_cell(*rows),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(result.total_rows()).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if let Some(warning) = &summary.warning {
        eprintln!("warning: {warning}");
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
