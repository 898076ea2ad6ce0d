// src/rules/model.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::config::{AnchorConfig, BoundaryConfig, RegexConfig, RuleConfig, TableConfig};
use crate::extractors::pattern::PatternBudget;
use crate::utils::error::RuleError;

/// The four evaluated rule types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    Anchor,
    Boundary,
    Regex,
    Table,
}

impl RuleType {
    /// Parses a wire name, accepting the long aliases as well.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ANCHOR" | "KEYWORD_ANCHOR" => Some(RuleType::Anchor),
            "BOUNDARY" | "CONTEXT_BOUNDARY" => Some(RuleType::Boundary),
            "REGEX" | "REGEX_PATTERN" => Some(RuleType::Regex),
            "TABLE" | "TABLE_CELL" => Some(RuleType::Table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Anchor => "ANCHOR",
            RuleType::Boundary => "BOUNDARY",
            RuleType::Regex => "REGEX",
            RuleType::Table => "TABLE",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

/// A rule as stored by the rule service: loosely typed `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub rule_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A loaded rule. The config is parsed and checked once, here, and never
/// re-read during extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRule {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub description: Option<String>,
    pub config: RuleConfig,
}

impl ExtractionRule {
    pub fn new(id: impl Into<String>, config: RuleConfig) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            priority: 0,
            enabled: true,
            description: None,
            config,
        }
    }

    pub fn anchor(id: impl Into<String>, config: AnchorConfig) -> Self {
        Self::new(id, RuleConfig::Anchor(config))
    }

    pub fn boundary(id: impl Into<String>, config: BoundaryConfig) -> Self {
        Self::new(id, RuleConfig::Boundary(config))
    }

    pub fn regex(id: impl Into<String>, config: RegexConfig) -> Self {
        Self::new(id, RuleConfig::Regex(config))
    }

    pub fn table(id: impl Into<String>, config: TableConfig) -> Self {
        Self::new(id, RuleConfig::Table(config))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `None` for reserved types this engine does not evaluate.
    pub fn rule_type(&self) -> Option<RuleType> {
        match &self.config {
            RuleConfig::Anchor(_) => Some(RuleType::Anchor),
            RuleConfig::Boundary(_) => Some(RuleType::Boundary),
            RuleConfig::Regex(_) => Some(RuleType::Regex),
            RuleConfig::Table(_) => Some(RuleType::Table),
            RuleConfig::Unsupported { .. } => None,
        }
    }

    /// Wire name of the type, including unsupported ones.
    pub fn type_name(&self) -> &str {
        match &self.config {
            RuleConfig::Unsupported { rule_type } => rule_type,
            _ => self.rule_type().map_or("", |t| t.as_str()),
        }
    }

    /// Converts and validates a wire definition under `budget`.
    pub fn from_definition(def: RuleDefinition, budget: &PatternBudget) -> Result<Self, RuleError> {
        let config = match RuleType::from_name(&def.rule_type) {
            Some(rule_type) => {
                let raw = normalize_config(&def.id, def.config)?;
                let parsed = parse_config(rule_type, raw).map_err(|source| RuleError::InvalidConfig {
                    rule_id: def.id.clone(),
                    rule_type: rule_type.to_string(),
                    source,
                })?;
                parsed.validate(&def.id, budget)?;
                parsed
            }
            None => {
                tracing::warn!("Rule '{}' has unsupported type '{}'", def.id, def.rule_type);
                RuleConfig::Unsupported {
                    rule_type: def.rule_type.clone(),
                }
            }
        };

        Ok(Self {
            name: if def.name.trim().is_empty() { def.id.clone() } else { def.name },
            id: def.id,
            priority: def.priority,
            enabled: def.enabled,
            description: def.description.filter(|d| !d.trim().is_empty()),
            config,
        })
    }
}

impl TryFrom<RuleDefinition> for ExtractionRule {
    type Error = RuleError;

    fn try_from(def: RuleDefinition) -> Result<Self, Self::Error> {
        ExtractionRule::from_definition(def, &PatternBudget::default())
    }
}

// Rule stores sometimes keep the config as an embedded JSON string.
fn normalize_config(rule_id: &str, raw: Value) -> Result<Value, RuleError> {
    match raw {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Default::default())),
        Value::String(s) => serde_json::from_str(&s).map_err(|e| RuleError::Invalid {
            rule_id: rule_id.to_string(),
            reason: format!("config string is not valid JSON: {}", e),
        }),
        other => Ok(other),
    }
}

fn parse_config(rule_type: RuleType, raw: Value) -> Result<RuleConfig, serde_json::Error> {
    Ok(match rule_type {
        RuleType::Anchor => RuleConfig::Anchor(serde_json::from_value(raw)?),
        RuleType::Boundary => RuleConfig::Boundary(serde_json::from_value(raw)?),
        RuleType::Regex => RuleConfig::Regex(serde_json::from_value(raw)?),
        RuleType::Table => RuleConfig::Table(serde_json::from_value(raw)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::config::{Direction, ExtractMethod};
    use serde_json::json;

    fn definition(rule_type: &str, config: Value) -> RuleDefinition {
        serde_json::from_value(json!({
            "id": "r1",
            "ruleType": rule_type,
            "config": config,
        }))
        .unwrap()
    }

    #[test]
    fn test_definition_defaults() {
        let def = definition("ANCHOR", json!({ "anchor": "合同金额" }));
        assert_eq!(def.priority, 0);
        assert!(def.enabled);
        assert!(def.description.is_none());
    }

    #[test]
    fn test_anchor_rule_parses_once() {
        let def = definition(
            "KEYWORD_ANCHOR",
            json!({ "anchor": "甲方|委托方", "direction": "both", "extractMethod": "line", "maxDistance": 50 }),
        );
        let rule = ExtractionRule::try_from(def).unwrap();
        assert_eq!(rule.rule_type(), Some(RuleType::Anchor));
        assert_eq!(rule.name, "r1");
        match rule.config {
            RuleConfig::Anchor(cfg) => {
                assert_eq!(cfg.anchor.as_slice().len(), 2);
                assert_eq!(cfg.direction, Direction::Both);
                assert_eq!(cfg.extract_method, ExtractMethod::Line);
                assert_eq!(cfg.max_distance, 50);
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_config_as_json_string() {
        let def = definition("REGEX", json!(r#"{"pattern":"\\d+","group":0}"#));
        let rule = ExtractionRule::try_from(def).unwrap();
        assert_eq!(rule.type_name(), "REGEX");
    }

    #[test]
    fn test_unknown_type_is_kept_as_unsupported() {
        let rule = ExtractionRule::try_from(definition("AI_EXTRACT", json!({}))).unwrap();
        assert_eq!(rule.rule_type(), None);
        assert_eq!(rule.type_name(), "AI_EXTRACT");
    }

    #[test]
    fn test_bad_enum_value_is_rejected_at_load() {
        let def = definition("ANCHOR", json!({ "anchor": "x", "direction": "sideways" }));
        let err = ExtractionRule::try_from(def).unwrap_err();
        assert!(matches!(err, RuleError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_required_key() {
        let err = ExtractionRule::try_from(definition("REGEX", json!({}))).unwrap_err();
        assert!(matches!(err, RuleError::InvalidConfig { .. }));

        let err = ExtractionRule::try_from(definition("ANCHOR", json!({ "anchor": "  " }))).unwrap_err();
        assert!(matches!(err, RuleError::MissingKey { key: "anchor", .. }));
    }

    #[test]
    fn test_lookaround_rejected_at_load() {
        let err = ExtractionRule::try_from(definition("REGEX", json!({ "pattern": "a(?=b)" }))).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }
}
