// src/tables/parser.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, Html};
use serde::Serialize;

use crate::result::CharSpan;
use crate::utils::text::char_offset;

// --- Markup Patterns (Lazy Static) ---
// Whole <table> elements inside OCR/markdown output
static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<table(?:\s[^>]*)?>.*?</table\s*>").expect("Failed to compile TABLE_RE")
});

// Rows; an unterminated <tr> is simply never matched
static ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<tr(?:\s[^>]*)?>(.*?)</tr\s*>").expect("Failed to compile ROW_RE")
});

// Data and header cells share one pattern so column order is preserved
static CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<t[dh](?:\s[^>]*)?>(.*?)</t[dh]\s*>").expect("Failed to compile CELL_RE")
});

static INLINE_SPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t]+").expect("Failed to compile INLINE_SPACE_RE")
});

static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").expect("Failed to compile BLANK_LINES_RE")
});

// --- Data Structures ---
/// A parsed HTML table: the first row is the header row, the rest are data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub raw_html: String,
    /// Character span of the table markup when it was located in a larger text.
    pub span: Option<CharSpan>,
}

impl TableGrid {
    /// Cell text, or `""` when the row is shorter than `col`.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Widest row in the table, header row included.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Values of one column across all data rows, missing cells as `""`.
    pub fn column(&self, col: usize) -> Vec<&str> {
        (0..self.rows.len()).map(|row| self.cell(row, col)).collect()
    }
}

// --- Parser ---
#[derive(Debug, Default, Clone, Copy)]
pub struct TableParser;

impl TableParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses one `<table>` fragment. Rows or cells that cannot be matched are
    /// skipped; the parse itself never fails.
    pub fn parse(&self, html: &str) -> TableGrid {
        let mut grid_rows: Vec<Vec<String>> = Vec::new();

        for row_caps in ROW_RE.captures_iter(html) {
            let row_html = row_caps.get(1).map_or("", |m| m.as_str());
            let cells: Vec<String> = CELL_RE
                .captures_iter(row_html)
                .map(|cell| cell_text(cell.get(1).map_or("", |m| m.as_str())))
                .collect();

            if cells.is_empty() {
                tracing::debug!("Skipping table row without parsable cells");
                continue;
            }
            grid_rows.push(cells);
        }

        let mut rows = grid_rows.into_iter();
        let headers = rows.next().unwrap_or_default();
        tracing::debug!("Parsed table: {} header cells, {} data rows", headers.len(), rows.len());

        TableGrid {
            headers,
            rows: rows.collect(),
            raw_html: html.to_string(),
            span: None,
        }
    }

    /// Finds and parses every `<table>…</table>` span in `text`, in document
    /// order. Tables without a header row are dropped.
    pub fn find_tables(&self, text: &str) -> Vec<TableGrid> {
        let mut tables = Vec::new();
        let mut last_byte = 0;
        let mut last_char = 0;

        for m in TABLE_RE.find_iter(text) {
            last_char += char_offset(&text[last_byte..], m.start() - last_byte);
            let start = last_char;
            let end = start + char_offset(m.as_str(), m.len());
            last_byte = m.start();

            let mut grid = self.parse(m.as_str());
            if grid.headers.is_empty() {
                tracing::warn!("Ignoring table at chars {}..{}: no header row could be parsed", start, end);
                continue;
            }
            grid.span = Some(CharSpan::new(start, end));
            tables.push(grid);
        }
        tables
    }
}

/// Plain text of a cell: nested tags dropped, entities decoded, `<br>` as a
/// line break, runs of spaces collapsed.
fn cell_text(inner_html: &str) -> String {
    let fragment = Html::parse_fragment(inner_html);
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text_node) => text.push_str(&text_node.text),
            Node::Element(el) if el.name().eq_ignore_ascii_case("br") => text.push('\n'),
            _ => {}
        }
    }

    let text = text.replace('\u{a0}', " ");
    let text = INLINE_SPACE_RE.replace_all(&text, " ");
    let text = BLANK_LINES_RE.replace_all(&text, "\n");
    text.trim().to_string()
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GOODS_TABLE: &str = "<table><tr><td>序号</td><td>货物名称</td><td>规格型号</td><td>产地</td></tr>\
        <tr><td>1</td><td>达撒</td><td>Sdsadas</td><td>达撒</td></tr>\
        <tr><td>2</td><td></td></tr></table>";

    #[test]
    fn test_parse_headers_and_rows() {
        let grid = TableParser::new().parse(GOODS_TABLE);
        assert_eq!(grid.headers, vec!["序号", "货物名称", "规格型号", "产地"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0], vec!["1", "达撒", "Sdsadas", "达撒"]);
        assert_eq!(grid.rows[1], vec!["2", ""]);
        assert_eq!(grid.raw_html, GOODS_TABLE);
    }

    #[test]
    fn test_missing_cells_read_as_empty() {
        let grid = TableParser::new().parse(GOODS_TABLE);
        assert_eq!(grid.cell(1, 3), "");
        assert_eq!(grid.cell(9, 0), "");
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.column(1), vec!["达撒", ""]);
    }

    #[test]
    fn test_cell_cleanup() {
        let html = r#"<table><tr><th class="h">名称</th><th>备注</th></tr>
            <tr><td><b>A&amp;B</b>&nbsp;公司</td><td>第一行<br/>第二行 &lt;注&gt; &quot;x&quot; &apos;y&apos;</td></tr></table>"#;
        let grid = TableParser::new().parse(html);
        assert_eq!(grid.headers, vec!["名称", "备注"]);
        assert_eq!(grid.rows[0][0], "A&B 公司");
        assert_eq!(grid.rows[0][1], "第一行\n第二行 <注> \"x\" 'y'");
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let html = "<table><tr><td>a</td><td>b</td></tr><tr>no cells here</tr><tr><td>1</td><td>2</td></tr><tr><td>dangling";
        let grid = TableParser::new().parse(html);
        assert_eq!(grid.headers, vec!["a", "b"]);
        assert_eq!(grid.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_garbage_input_never_panics() {
        let grid = TableParser::new().parse("<<<tr>>><td</td></tr");
        assert!(grid.headers.is_empty());
        assert!(grid.rows.is_empty());
    }

    #[test]
    fn test_find_tables_records_char_spans() {
        let text = format!("合同正文：\n{}\n尾部<table><tr><td>x</td></tr></table>", GOODS_TABLE);
        let tables = TableParser::new().find_tables(&text);
        assert_eq!(tables.len(), 2);

        let first = tables[0].span.unwrap();
        assert_eq!(first.start, 6);
        let chars: Vec<char> = text.chars().collect();
        let slice: String = chars[first.start..first.end].iter().collect();
        assert_eq!(slice, GOODS_TABLE);

        let second = tables[1].span.unwrap();
        let slice: String = chars[second.start..second.end].iter().collect();
        assert_eq!(slice, "<table><tr><td>x</td></tr></table>");
        assert!(tables[1].rows.is_empty());
    }

    #[test]
    fn test_find_tables_skips_headerless_tables() {
        let tables = TableParser::new().find_tables("<table><caption>空</caption></table>");
        assert!(tables.is_empty());
    }
}
