// src/result.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extractors::Extraction;
use crate::utils::error::ExtractError;

/// Half-open character span into the original input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharSpan {
    pub start: usize,
    pub end: usize,
}

impl CharSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Step-by-step trace collected during one extraction call.
/// Disabled traces drop every line.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    enabled: bool,
    lines: Vec<String>,
}

impl Trace {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, lines: Vec::new() }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn note(&mut self, line: impl fmt::Display) {
        if self.enabled {
            self.lines.push(line.to_string());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Outcome of evaluating one rule (or the winning rule of a batch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_matches: Vec<String>,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug_info: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_data: Option<serde_json::Value>,
}

impl ExtractionResult {
    /// Builds a successful result. Blank values become a not-found failure so a
    /// successful result always carries real content.
    pub fn from_extraction(extraction: Extraction, trace: Trace) -> Self {
        if extraction.value.trim().is_empty() {
            let mut trace = trace;
            trace.note("extracted value is blank, treating as failure");
            return Self::failure(&ExtractError::not_found("extracted value is empty"), trace);
        }

        let (start_position, end_position) = match extraction.span {
            Some(span) => (Some(span.start), Some(span.end)),
            None => (None, None),
        };

        Self {
            success: true,
            value: Some(extraction.value),
            all_matches: extraction.all_matches,
            confidence: extraction.confidence.min(100),
            matched_rule_id: None,
            start_position,
            end_position,
            error_message: None,
            debug_info: trace.into_lines(),
            table_data: extraction.table_data,
        }
    }

    pub fn failure(err: &ExtractError, trace: Trace) -> Self {
        Self {
            success: false,
            error_message: Some(err.to_string()),
            debug_info: trace.into_lines(),
            ..Self::default()
        }
    }

    pub fn span(&self) -> Option<CharSpan> {
        match (self.start_position, self.end_position) {
            (Some(start), Some(end)) => Some(CharSpan::new(start, end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_value_becomes_failure() {
        let result = ExtractionResult::from_extraction(Extraction::new("  \n", 90), Trace::new(true));
        assert!(!result.success);
        assert!(result.value.is_none());
        assert_eq!(result.error_message.as_deref(), Some("Not found: extracted value is empty"));
        assert_eq!(result.debug_info.len(), 1);
    }

    #[test]
    fn test_disabled_trace_keeps_nothing() {
        let mut trace = Trace::new(false);
        trace.note("ignored");
        assert!(trace.lines().is_empty());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_fields() {
        let extraction = Extraction::new("100,000.00", 85).with_span(CharSpan::new(7, 17));
        let result = ExtractionResult::from_extraction(extraction, Trace::new(false));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["value"], "100,000.00");
        assert_eq!(json["startPosition"], 7);
        assert_eq!(json["endPosition"], 17);
        assert!(json.get("errorMessage").is_none());
        assert!(json.get("allMatches").is_none());
    }
}
