// src/rules/loader.rs
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::model::{ExtractionRule, RuleDefinition};
use crate::extractors::pattern::PatternBudget;
use crate::utils::error::{AppError, RuleError};

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Many(Vec<RuleDefinition>),
    One(RuleDefinition),
}

/// Parses a JSON document holding one rule definition or an array of them.
pub fn parse_rules(json: &str) -> Result<Vec<ExtractionRule>, RuleError> {
    parse_rules_with(json, &PatternBudget::default())
}

pub fn parse_rules_with(json: &str, budget: &PatternBudget) -> Result<Vec<ExtractionRule>, RuleError> {
    let definitions = match serde_json::from_str::<RuleFile>(json) {
        Ok(RuleFile::Many(defs)) => defs,
        Ok(RuleFile::One(def)) => vec![def],
        // surface the single-rule parse error
        Err(_) => vec![serde_json::from_str::<RuleDefinition>(json)?],
    };

    definitions
        .into_iter()
        .map(|def| ExtractionRule::from_definition(def, budget))
        .collect()
}

/// Reads and validates a rule file.
pub fn load_rules<P: AsRef<Path>>(path: P, budget: &PatternBudget) -> Result<Vec<ExtractionRule>, AppError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let rules = parse_rules_with(&json, budget)?;
    tracing::info!("Loaded {} rule(s) from {}", rules.len(), path.display());
    Ok(rules)
}
