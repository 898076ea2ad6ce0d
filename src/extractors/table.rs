// src/extractors/table.rs
//! Cell and whole-table extraction from HTML tables embedded in the text.

use crate::extractors::pattern::select_occurrence;
use crate::extractors::{Extraction, ExtractionStrategy};
use crate::result::Trace;
use crate::rules::{TableConfig, TableMode};
use crate::tables::render::{render, to_json_rows};
use crate::tables::{TableGrid, TableParser};
use crate::utils::error::ExtractError;

const CELL_CONFIDENCE: u8 = 90;
const TABLE_CONFIDENCE: u8 = 95;

#[derive(Debug, Clone, Default)]
pub struct TableCellMatcher {
    parser: TableParser,
}

impl TableCellMatcher {
    pub fn new() -> Self {
        Self { parser: TableParser::new() }
    }

    /// First table in document order whose headers carry every required column.
    fn find_table(&self, text: &str, cfg: &TableConfig, trace: &mut Trace) -> Result<TableGrid, ExtractError> {
        let tables = self.parser.find_tables(text);
        trace.note(format!("found {} table(s)", tables.len()));
        if tables.is_empty() {
            return Err(ExtractError::not_found("no table found in text"));
        }

        for (idx, grid) in tables.into_iter().enumerate() {
            match cfg.header_pattern.resolve(&grid.headers, false) {
                Some(matches) => {
                    let tiers: Vec<String> = matches
                        .iter()
                        .map(|m| format!("{}={}", m.column, m.tier))
                        .collect();
                    trace.note(format!("table {} matches header feature ({})", idx + 1, tiers.join(", ")));
                    return Ok(grid);
                }
                None => trace.note(format!("table {} headers {:?} do not match", idx + 1, grid.headers)),
            }
        }
        Err(ExtractError::not_found(format!(
            "no table matches header feature '{}'",
            cfg.header_pattern
        )))
    }

    fn whole_table(&self, grid: &TableGrid, cfg: &TableConfig, trace: &mut Trace) -> Extraction {
        trace.note(format!(
            "rendering {} row(s) as {:?}",
            grid.rows.len(),
            cfg.format
        ));
        let mut out = Extraction::new(render(grid, cfg.format), TABLE_CONFIDENCE).with_table_data(to_json_rows(grid));
        out.span = grid.span;
        out
    }

    fn cell(&self, grid: &TableGrid, cfg: &TableConfig, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        let col = resolve_column(grid, cfg)?;
        trace.note(format!("column {} ('{}')", col + 1, grid.headers.get(col).map_or("", String::as_str)));

        let mut all = Vec::new();
        let value = if let Some(row) = cfg.row_index() {
            if row > grid.rows.len() {
                return Err(ExtractError::range(format!(
                    "row index {} is beyond the {} data row(s)",
                    row,
                    grid.rows.len()
                )));
            }
            grid.cell(row - 1, col).to_string()
        } else if let Some(marker) = cfg.row_marker.as_deref() {
            let row = grid
                .rows
                .iter()
                .position(|r| r.join(" ").contains(marker))
                .ok_or_else(|| ExtractError::not_found(format!("no row contains marker '{}'", marker)))?;
            trace.note(format!("marker '{}' in data row {}", marker, row + 1));
            grid.cell(row, col).to_string()
        } else {
            let values: Vec<&str> = grid
                .column(col)
                .into_iter()
                .filter(|v| !v.trim().is_empty())
                .collect();
            trace.note(format!(
                "column has {} non-blank value(s), occurrence {} requested",
                values.len(),
                cfg.occurrence
            ));
            let selection = select_occurrence(values, cfg.occurrence, cfg.return_all)?;
            all = selection.all.iter().map(|v| v.trim().to_string()).collect();
            selection.chosen.to_string()
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(ExtractError::not_found("table cell is empty"));
        }
        let mut out = Extraction::new(value, CELL_CONFIDENCE).with_all_matches(all);
        out.span = grid.span;
        Ok(out)
    }
}

fn resolve_column(grid: &TableGrid, cfg: &TableConfig) -> Result<usize, ExtractError> {
    if let Some(target) = cfg.target_column.as_deref() {
        return grid
            .headers
            .iter()
            .position(|h| h.contains(target))
            .ok_or_else(|| ExtractError::not_found(format!("column '{}' not found in headers", target)));
    }
    match cfg.column_index() {
        Some(idx) if idx > grid.width() => Err(ExtractError::range(format!(
            "column index {} is beyond the table width {}",
            idx,
            grid.width()
        ))),
        Some(idx) => Ok(idx - 1),
        None => Err(ExtractError::config("either targetColumn or columnIndex is required")),
    }
}

impl ExtractionStrategy for TableCellMatcher {
    type Config = TableConfig;

    fn name(&self) -> &'static str {
        "table-cell"
    }

    fn extract(&self, text: &str, cfg: &TableConfig, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        if cfg.header_pattern.is_empty() {
            return Err(ExtractError::config("headerPattern must not be blank"));
        }
        let grid = self.find_table(text, cfg, trace)?;
        tracing::debug!("Selected table with headers {:?}", grid.headers);

        match cfg.extract_mode {
            TableMode::Table => Ok(self.whole_table(&grid, cfg, trace)),
            TableMode::Cell => self.cell(&grid, cfg, trace),
        }
    }
}
