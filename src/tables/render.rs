// src/tables/render.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::parser::TableGrid;

/// Output format for whole-table extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Json,
    Markdown,
    Html,
}

/// Rows as objects keyed by header, in column order. Cells beyond the header
/// row are dropped; short rows just have fewer keys.
pub fn to_json_rows(grid: &TableGrid) -> Value {
    let rows = grid
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = grid
                .headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.clone(), Value::String(cell.clone())))
                .collect();
            Value::Object(obj)
        })
        .collect();
    Value::Array(rows)
}

pub fn to_markdown(grid: &TableGrid) -> String {
    // every line spans the widest row
    let width = grid.width();
    let mut out = String::new();

    push_markdown_row(&mut out, pad(&grid.headers, width));
    push_markdown_row(&mut out, std::iter::repeat("---").take(width));
    for row in &grid.rows {
        push_markdown_row(&mut out, pad(row, width));
    }
    out
}

fn pad(cells: &[String], width: usize) -> impl Iterator<Item = &str> {
    (0..width).map(move |i| cells.get(i).map_or("", String::as_str))
}

fn push_markdown_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&cell.replace('|', "\\|").replace('\n', " "));
        out.push_str(" |");
    }
    out.push('\n');
}

/// Renders the grid in `format`. JSON rendering cannot fail for string cells.
pub fn render(grid: &TableGrid, format: TableFormat) -> String {
    match format {
        TableFormat::Json => to_json_rows(grid).to_string(),
        TableFormat::Markdown => to_markdown(grid),
        TableFormat::Html => grid.raw_html.clone(),
    }
}
