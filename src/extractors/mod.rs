// src/extractors/mod.rs
pub mod anchor;
pub mod boundary;
pub mod catalog;
pub mod pattern;
pub mod regex;
pub mod table;

use serde_json::Value;

use crate::result::{CharSpan, Trace};
use crate::utils::error::ExtractError;

// Re-export key extraction types for convenience
pub use anchor::{KeywordAnchorMatcher, DEFAULT_ANCHOR_PATTERN};
pub use boundary::ContextBoundaryMatcher;
pub use pattern::{PatternBudget, PatternFlags};
pub use self::regex::RegexMatcher;
pub use table::TableCellMatcher;

/// What a strategy pulled out of the text, before it becomes a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub value: String,
    pub all_matches: Vec<String>,
    pub confidence: u8,
    pub span: Option<CharSpan>,
    pub table_data: Option<Value>,
}

impl Extraction {
    pub fn new(value: impl Into<String>, confidence: u8) -> Self {
        Self {
            value: value.into(),
            all_matches: Vec::new(),
            confidence,
            span: None,
            table_data: None,
        }
    }

    pub fn with_span(mut self, span: CharSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_all_matches(mut self, all: Vec<String>) -> Self {
        self.all_matches = all;
        self
    }

    pub fn with_table_data(mut self, data: Value) -> Self {
        self.table_data = Some(data);
        self
    }
}

/// One matching strategy. Implementations are stateless apart from their
/// pattern budget, so a single instance can serve any number of threads.
pub trait ExtractionStrategy {
    type Config;

    fn name(&self) -> &'static str;

    fn extract(&self, text: &str, config: &Self::Config, trace: &mut Trace) -> Result<Extraction, ExtractError>;
}
