// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::result::{CharSpan, ExtractionResult};
use crate::rules::{ExtractionRule, RuleType};
use crate::utils::error::AppError;
use crate::utils::text::byte_offset;

/// One span of the input to mark, with the label shown on hover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub span: CharSpan,
    pub kind: Option<RuleType>,
    pub label: String,
}

/// Writes the input text as an HTML page with the given spans highlighted.
/// Overlapping spans after the first are dropped.
pub fn save_debug_html(text: &str, filename: &Path, highlights: &[Highlight]) -> Result<(), AppError> {
    let mut file = File::create(filename)?;
    file.write_all(render_debug_html(text, highlights).as_bytes())?;

    tracing::info!("Saved debug HTML to {}", filename.display());
    Ok(())
}

pub fn render_debug_html(text: &str, highlights: &[Highlight]) -> String {
    // Add debug styling in head
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    debug_html.push_str("pre { white-space: pre-wrap; }\n");
    debug_html.push_str(".highlight-anchor { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-boundary { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-regex { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-table { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n<pre>");

    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|h| (h.span.start, h.span.end));

    let mut last_pos = 0;
    for h in sorted {
        let start = byte_offset(text, h.span.start);
        let end = byte_offset(text, h.span.end);
        if start < last_pos || start >= end {
            tracing::debug!("Skipping overlapping or empty highlight '{}'", h.label);
            continue;
        }

        debug_html.push_str(&escape(&text[last_pos..start]));

        let css_class = match h.kind {
            Some(RuleType::Anchor) => "highlight-anchor",
            Some(RuleType::Boundary) => "highlight-boundary",
            Some(RuleType::Regex) => "highlight-regex",
            Some(RuleType::Table) => "highlight-table",
            None => "highlight-custom",
        };
        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"{}: chars {}-{}\">",
            css_class,
            escape(&h.label),
            h.span.start,
            h.span.end
        ));
        debug_html.push_str(&escape(&text[start..end]));
        debug_html.push_str("</span>");

        last_pos = end;
    }

    debug_html.push_str(&escape(&text[last_pos..]));
    debug_html.push_str("</pre>\n</body>\n</html>");
    debug_html
}

/// Highlights the span of every successful result.
pub fn create_debug_html(
    text: &str,
    filename: &Path,
    results: &[(&ExtractionRule, &ExtractionResult)],
) -> Result<(), AppError> {
    let highlights: Vec<Highlight> = results
        .iter()
        .filter(|(_, result)| result.success)
        .filter_map(|(rule, result)| {
            result.span().map(|span| Highlight {
                span,
                kind: rule.rule_type(),
                label: rule.id.clone(),
            })
        })
        .collect();

    save_debug_html(text, filename, &highlights)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlight(start: usize, end: usize, kind: Option<RuleType>) -> Highlight {
        Highlight {
            span: CharSpan::new(start, end),
            kind,
            label: "r1".into(),
        }
    }

    #[test]
    fn test_marks_char_spans_and_escapes_markup() {
        let text = "金额：100元 <b>";
        let html = render_debug_html(text, &[highlight(3, 6, Some(RuleType::Anchor))]);
        assert!(html.contains("金额：<span class=\"highlight-anchor\" title=\"r1: chars 3-6\">100</span>元 &lt;b&gt;"));
    }

    #[test]
    fn test_overlaps_are_skipped() {
        let html = render_debug_html(
            "abcdef",
            &[highlight(0, 4, None), highlight(2, 5, Some(RuleType::Regex))],
        );
        assert!(html.contains("<span class=\"highlight-custom\" title=\"r1: chars 0-4\">abcd</span>ef"));
        assert!(!html.contains("highlight-regex\""));
    }

    #[test]
    fn test_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc_annotated.html");
        save_debug_html("text", &path, &[]).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("<pre>text</pre>"));
    }
}
