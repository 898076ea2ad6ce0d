// src/utils/error.rs
use thiserror::Error;

// Failures raised while evaluating a single rule against a text.
// The engine turns every one of these into a failed ExtractionResult.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Out of range: {0}")]
    Range(String),

    #[error("Requested occurrence {requested} but only {found} matches found")]
    OccurrenceOutOfRange { requested: usize, found: usize },

    #[error("Pattern budget exceeded: {0}")]
    Budget(String),
}

impl ExtractError {
    pub fn config(msg: impl Into<String>) -> Self {
        ExtractError::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ExtractError::NotFound(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        ExtractError::Range(msg.into())
    }
}

// Problems found while loading a rule definition, before any text is seen.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule '{rule_id}' has an invalid {rule_type} config: {source}")]
    InvalidConfig {
        rule_id: String,
        rule_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Rule '{rule_id}' is missing required key '{key}'")]
    MissingKey { rule_id: String, key: &'static str },

    #[error("Rule '{rule_id}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        rule_id: String,
        pattern: String,
        reason: String,
    },

    #[error("Rule '{rule_id}' is invalid: {reason}")]
    Invalid { rule_id: String, reason: String },

    #[error("Failed to parse rule file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Rule loading failed: {0}")]
    Rule(#[from] RuleError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurrence_message_reports_found_count() {
        let err = ExtractError::OccurrenceOutOfRange { requested: 5, found: 2 };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains("only 2 matches"));
    }

    #[test]
    fn test_rule_error_wraps_into_app_error() {
        let err: AppError = RuleError::MissingKey { rule_id: "r1".into(), key: "anchor" }.into();
        assert_eq!(err.to_string(), "Rule loading failed: Rule 'r1' is missing required key 'anchor'");
    }
}
