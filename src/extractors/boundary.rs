// src/extractors/boundary.rs
use crate::extractors::pattern::{select_occurrence, PatternBudget};
use crate::extractors::{Extraction, ExtractionStrategy};
use crate::result::{CharSpan, Trace};
use crate::rules::BoundaryConfig;
use crate::utils::error::ExtractError;
use crate::utils::text::{char_len, char_offset, preview, shift_chars};

const CONFIDENCE: u8 = 90;

/// Extracts the text between a start and an end marker.
#[derive(Debug, Clone, Default)]
pub struct ContextBoundaryMatcher {
    budget: PatternBudget,
}

impl ContextBoundaryMatcher {
    pub fn new(budget: PatternBudget) -> Self {
        Self { budget }
    }

    /// Byte range between the boundaries after applying both offsets.
    fn resolve_range(&self, text: &str, cfg: &BoundaryConfig, trace: &mut Trace) -> Result<(usize, usize), ExtractError> {
        if cfg.start_boundary.is_none() && cfg.end_boundary.is_none() {
            return Err(ExtractError::config("start and end boundary cannot both be blank"));
        }

        let start = match cfg.start_boundary.as_deref() {
            Some(marker) => {
                let found = text
                    .find(marker)
                    .ok_or_else(|| ExtractError::not_found(format!("start boundary '{}' not found", marker)))?;
                let after = found + marker.len();
                trace.note(format!("start boundary ends at char {}", char_offset(text, after)));
                shift_chars(text, after, cfg.start_offset).ok_or_else(|| {
                    ExtractError::range(format!("startOffset {} moves outside the text", cfg.start_offset))
                })?
            }
            None => 0,
        };

        let end = match cfg.end_boundary.as_deref() {
            Some(marker) => {
                let found = text[start..]
                    .find(marker)
                    .map(|i| start + i)
                    .ok_or_else(|| ExtractError::not_found(format!("end boundary '{}' not found", marker)))?;
                trace.note(format!("end boundary starts at char {}", char_offset(text, found)));
                shift_chars(text, found, cfg.end_offset).ok_or_else(|| {
                    ExtractError::range(format!("endOffset {} moves outside the text", cfg.end_offset))
                })?
            }
            None => text.len(),
        };

        if start >= end {
            return Err(ExtractError::range(format!(
                "start position {} is not before end position {}",
                char_offset(text, start),
                char_offset(text, end)
            )));
        }
        Ok((start, end))
    }
}

impl ExtractionStrategy for ContextBoundaryMatcher {
    type Config = BoundaryConfig;

    fn name(&self) -> &'static str {
        "context-boundary"
    }

    fn extract(&self, text: &str, cfg: &BoundaryConfig, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        let (start, end) = self.resolve_range(text, cfg, trace)?;
        let range = &text[start..end];
        trace.note(format!("range ({} chars): {}", char_len(range), preview(range, 100)));

        let (picked, offset) = match cfg.effective_pattern() {
            Some(pattern) => {
                let re = self.budget.compile(&pattern, cfg.flags())?;
                let matches = self.budget.find_all(&re, range)?;
                trace.note(format!(
                    "pattern '{}' found {} match(es), occurrence {} requested",
                    pattern,
                    matches.len(),
                    cfg.occurrence
                ));
                let chosen = select_occurrence(matches, cfg.occurrence, false)?.chosen;
                (chosen.as_str(), chosen.start())
            }
            None => (range, 0),
        };

        let leading = picked.len() - picked.trim_start().len();
        let value = picked.trim();
        if value.is_empty() {
            return Err(ExtractError::not_found("nothing between the boundaries"));
        }

        let char_start = char_offset(text, start + offset + leading);
        let span = CharSpan::new(char_start, char_start + char_len(value));
        tracing::debug!("Boundary extraction matched chars {}..{}", span.start, span.end);
        Ok(Extraction::new(value, CONFIDENCE).with_span(span))
    }
}
