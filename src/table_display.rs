use comfy_table::{Attribute, Cell, ContentArrangement, Table as DisplayTable};
use rowset::{RowRef, Table};

/// Render query results as a terminal table.
pub fn render_rows(table: &Table, rows: &[RowRef<'_>]) -> String {
    if rows.is_empty() {
        return "No results found.".to_string();
    }

    let mut display = DisplayTable::new();
    display.set_content_arrangement(ContentArrangement::Dynamic);

    let headers: Vec<Cell> = table
        .columns()
        .into_iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect();
    display.set_header(headers);

    for row in rows {
        let cells: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
        display.add_row(cells);
    }

    format!("{display}\n\n{} rows returned", rows.len())
}
