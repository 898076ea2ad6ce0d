// src/rules/config.rs
//! Strongly typed options for each rule type. These deserialize from the
//! camelCase `config` object of a rule definition.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::extractors::anchor::DEFAULT_ANCHOR_PATTERN;
use crate::extractors::pattern::{lazify, PatternBudget, PatternFlags};
use crate::tables::{HeaderFeature, TableFormat};
use crate::utils::error::RuleError;

// Default value functions for serde
fn one() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_distance() -> usize {
    200
}

fn default_delimiter() -> String {
    "：".to_string()
}

/// Blank strings are the same as an absent key.
fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Ordered keyword alternatives parsed from `a|b|c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Alternatives(Vec<String>);

impl Alternatives {
    pub fn parse(raw: &str) -> Self {
        Alternatives(
            raw.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Alternatives {
    fn from(value: String) -> Self {
        Alternatives::parse(&value)
    }
}

impl From<&str> for Alternatives {
    fn from(value: &str) -> Self {
        Alternatives::parse(value)
    }
}

impl From<Alternatives> for String {
    fn from(value: Alternatives) -> Self {
        value.0.join("|")
    }
}

impl fmt::Display for Alternatives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Before,
    #[default]
    After,
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMethod {
    #[default]
    Regex,
    Line,
    Delimiter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    #[default]
    Cell,
    Table,
}

// --- Keyword anchor ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorConfig {
    pub anchor: Alternatives,
    /// Which anchor hit to use, counting every alternative in text order.
    #[serde(default = "one")]
    pub anchor_occurrence: usize,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub extract_method: ExtractMethod,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub pattern: Option<String>,
    /// Window size in characters.
    #[serde(default = "default_max_distance")]
    pub max_distance: usize,
    #[serde(default = "default_true")]
    pub trim: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default = "one")]
    pub occurrence: usize,
    #[serde(default)]
    pub return_all: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Bare quantifiers in `pattern` are made lazy unless this is set.
    #[serde(default)]
    pub greedy: bool,
    /// Locate the anchor on full-width/half-width folded punctuation.
    #[serde(default = "default_true")]
    pub normalize_punctuation: bool,
}

impl AnchorConfig {
    pub fn new(anchor: &str) -> Self {
        Self {
            anchor: Alternatives::parse(anchor),
            anchor_occurrence: 1,
            direction: Direction::default(),
            extract_method: ExtractMethod::default(),
            pattern: None,
            max_distance: default_max_distance(),
            trim: true,
            ignore_case: false,
            multiline: false,
            occurrence: 1,
            return_all: false,
            delimiter: default_delimiter(),
            greedy: false,
            normalize_punctuation: true,
        }
    }

    pub fn flags(&self) -> PatternFlags {
        PatternFlags::new(self.ignore_case, self.multiline)
    }

    /// The user pattern with the lazy rewrite applied unless greedy matching
    /// was asked for.
    pub fn user_pattern(&self) -> Option<Cow<'_, str>> {
        self.pattern.as_deref().map(|p| {
            if self.greedy {
                Cow::Borrowed(p)
            } else {
                Cow::Owned(lazify(p))
            }
        })
    }

    /// Pattern used by the regex method.
    pub fn regex_pattern(&self) -> Cow<'_, str> {
        self.user_pattern().unwrap_or(Cow::Borrowed(DEFAULT_ANCHOR_PATTERN))
    }

    fn validate(&self, rule_id: &str, budget: &PatternBudget) -> Result<(), RuleError> {
        if self.anchor.is_empty() {
            return Err(missing(rule_id, "anchor"));
        }
        positive(rule_id, "occurrence", self.occurrence)?;
        positive(rule_id, "anchorOccurrence", self.anchor_occurrence)?;
        if self.extract_method == ExtractMethod::Delimiter && self.delimiter.is_empty() {
            return Err(invalid(rule_id, "delimiter must not be empty"));
        }
        if let Some(pattern) = self.user_pattern() {
            check_pattern(rule_id, &pattern, self.flags(), budget)?;
        }
        Ok(())
    }
}

// --- Context boundary ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryConfig {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub start_boundary: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub end_boundary: Option<String>,
    /// Characters added to the position right after the start boundary.
    #[serde(default)]
    pub start_offset: i64,
    /// Characters added to the position of the end boundary.
    #[serde(default)]
    pub end_offset: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub extract_pattern: Option<String>,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub greedy: bool,
    #[serde(default = "one")]
    pub occurrence: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            start_boundary: None,
            end_boundary: None,
            start_offset: 0,
            end_offset: 0,
            extract_pattern: None,
            multiline: false,
            greedy: false,
            occurrence: 1,
        }
    }
}

impl BoundaryConfig {
    pub fn between(start: &str, end: &str) -> Self {
        Self {
            start_boundary: Some(start.to_string()).filter(|s| !s.trim().is_empty()),
            end_boundary: Some(end.to_string()).filter(|s| !s.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn flags(&self) -> PatternFlags {
        PatternFlags::new(false, self.multiline)
    }

    /// Sub-pattern with the lazy rewrite applied unless greedy matching was asked for.
    pub fn effective_pattern(&self) -> Option<Cow<'_, str>> {
        self.extract_pattern.as_deref().map(|p| {
            if self.greedy {
                Cow::Borrowed(p)
            } else {
                Cow::Owned(lazify(p))
            }
        })
    }

    fn validate(&self, rule_id: &str, budget: &PatternBudget) -> Result<(), RuleError> {
        if self.start_boundary.is_none() && self.end_boundary.is_none() {
            return Err(missing(rule_id, "startBoundary"));
        }
        positive(rule_id, "occurrence", self.occurrence)?;
        if let Some(pattern) = self.effective_pattern() {
            check_pattern(rule_id, &pattern, self.flags(), budget)?;
        }
        Ok(())
    }
}

// --- Raw regex ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexConfig {
    pub pattern: String,
    #[serde(default)]
    pub group: usize,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default = "one")]
    pub occurrence: usize,
    #[serde(default)]
    pub return_all: bool,
}

impl RegexConfig {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            group: 0,
            multiline: false,
            ignore_case: false,
            occurrence: 1,
            return_all: false,
        }
    }

    pub fn flags(&self) -> PatternFlags {
        PatternFlags::new(self.ignore_case, self.multiline)
    }

    fn validate(&self, rule_id: &str, budget: &PatternBudget) -> Result<(), RuleError> {
        if self.pattern.trim().is_empty() {
            return Err(missing(rule_id, "pattern"));
        }
        positive(rule_id, "occurrence", self.occurrence)?;
        let re = check_pattern(rule_id, &self.pattern, self.flags(), budget)?;
        if self.group >= re.captures_len() {
            return Err(invalid(
                rule_id,
                format!("group {} does not exist, pattern has {} groups", self.group, re.captures_len() - 1),
            ));
        }
        Ok(())
    }
}

// --- Table ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(default)]
    pub extract_mode: TableMode,
    pub header_pattern: HeaderFeature,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub target_column: Option<String>,
    /// 1-based; 0 counts as absent.
    #[serde(default)]
    pub column_index: Option<usize>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub row_marker: Option<String>,
    /// 1-based data row, header excluded; 0 counts as absent.
    #[serde(default)]
    pub row_index: Option<usize>,
    #[serde(default = "one")]
    pub occurrence: usize,
    #[serde(default)]
    pub return_all: bool,
    #[serde(default)]
    pub format: TableFormat,
}

impl TableConfig {
    pub fn cell(header_pattern: &str) -> Self {
        Self {
            extract_mode: TableMode::Cell,
            header_pattern: HeaderFeature::parse(header_pattern),
            target_column: None,
            column_index: None,
            row_marker: None,
            row_index: None,
            occurrence: 1,
            return_all: false,
            format: TableFormat::default(),
        }
    }

    pub fn whole_table(header_pattern: &str, format: TableFormat) -> Self {
        Self {
            extract_mode: TableMode::Table,
            format,
            ..Self::cell(header_pattern)
        }
    }

    pub fn column_index(&self) -> Option<usize> {
        self.column_index.filter(|&i| i > 0)
    }

    pub fn row_index(&self) -> Option<usize> {
        self.row_index.filter(|&i| i > 0)
    }

    fn validate(&self, rule_id: &str) -> Result<(), RuleError> {
        if self.header_pattern.is_empty() {
            return Err(missing(rule_id, "headerPattern"));
        }
        positive(rule_id, "occurrence", self.occurrence)?;
        if self.extract_mode == TableMode::Cell && self.target_column.is_none() && self.column_index().is_none() {
            return Err(missing(rule_id, "targetColumn"));
        }
        Ok(())
    }
}

/// Typed configuration, one variant per rule type.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleConfig {
    Anchor(AnchorConfig),
    Boundary(BoundaryConfig),
    Regex(RegexConfig),
    Table(TableConfig),
    /// A reserved rule type name this engine does not evaluate.
    Unsupported { rule_type: String },
}

impl RuleConfig {
    pub fn validate(&self, rule_id: &str, budget: &PatternBudget) -> Result<(), RuleError> {
        match self {
            RuleConfig::Anchor(cfg) => cfg.validate(rule_id, budget),
            RuleConfig::Boundary(cfg) => cfg.validate(rule_id, budget),
            RuleConfig::Regex(cfg) => cfg.validate(rule_id, budget),
            RuleConfig::Table(cfg) => cfg.validate(rule_id),
            RuleConfig::Unsupported { .. } => Ok(()),
        }
    }
}

fn missing(rule_id: &str, key: &'static str) -> RuleError {
    RuleError::MissingKey {
        rule_id: rule_id.to_string(),
        key,
    }
}

fn invalid(rule_id: &str, reason: impl Into<String>) -> RuleError {
    RuleError::Invalid {
        rule_id: rule_id.to_string(),
        reason: reason.into(),
    }
}

fn positive(rule_id: &str, key: &str, value: usize) -> Result<(), RuleError> {
    if value == 0 {
        return Err(invalid(rule_id, format!("{} is 1-based and must be at least 1", key)));
    }
    Ok(())
}

fn check_pattern(
    rule_id: &str,
    pattern: &str,
    flags: PatternFlags,
    budget: &PatternBudget,
) -> Result<regex::Regex, RuleError> {
    budget.compile(pattern, flags).map_err(|e| RuleError::InvalidPattern {
        rule_id: rule_id.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anchor_defaults() {
        let cfg: AnchorConfig = serde_json::from_value(json!({ "anchor": "合同金额|总价" })).unwrap();
        assert_eq!(cfg.anchor.as_slice(), &["合同金额".to_string(), "总价".to_string()]);
        assert_eq!(cfg.direction, Direction::After);
        assert_eq!(cfg.extract_method, ExtractMethod::Regex);
        assert_eq!(cfg.max_distance, 200);
        assert!(cfg.trim);
        assert_eq!(cfg.occurrence, 1);
        assert_eq!(cfg.delimiter, "：");
        assert!(!cfg.greedy);
        assert!(cfg.normalize_punctuation);
        assert_eq!(cfg, AnchorConfig::new("合同金额|总价"));
        assert_eq!(cfg.regex_pattern(), DEFAULT_ANCHOR_PATTERN);
    }

    #[test]
    fn test_anchor_lazy_rewrite_unless_greedy() {
        let mut cfg = AnchorConfig::new("x");
        cfg.pattern = Some(r"\d+".into());
        assert_eq!(cfg.regex_pattern(), r"\d+?");
        cfg.greedy = true;
        assert_eq!(cfg.regex_pattern(), r"\d+");

        let opted_out: AnchorConfig =
            serde_json::from_value(json!({ "anchor": "x", "normalizePunctuation": false })).unwrap();
        assert!(!opted_out.normalize_punctuation);
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let cfg: TableConfig = serde_json::from_value(json!({
            "headerPattern": "序号|货物名称",
            "targetColumn": "",
            "columnIndex": 2,
            "rowMarker": "  ",
            "rowIndex": 0
        }))
        .unwrap();
        assert!(cfg.target_column.is_none());
        assert!(cfg.row_marker.is_none());
        assert_eq!(cfg.column_index(), Some(2));
        assert_eq!(cfg.row_index(), None);
        assert!(cfg.validate("t").is_ok());
    }

    #[test]
    fn test_boundary_requires_one_side() {
        let cfg = BoundaryConfig::between("", " ");
        let err = cfg.validate("b", &PatternBudget::default()).unwrap_err();
        assert!(matches!(err, RuleError::MissingKey { key: "startBoundary", .. }));
    }

    #[test]
    fn test_boundary_pattern_is_lazy_by_default() {
        let mut cfg = BoundaryConfig::between("甲方", "乙方");
        cfg.extract_pattern = Some("第.*条".into());
        assert_eq!(cfg.effective_pattern().unwrap(), "第.*?条");
        cfg.greedy = true;
        assert_eq!(cfg.effective_pattern().unwrap(), "第.*条");
    }

    #[test]
    fn test_regex_group_must_exist() {
        let mut cfg = RegexConfig::new(r"(\d+)元");
        cfg.group = 2;
        let err = cfg.validate("r", &PatternBudget::default()).unwrap_err();
        assert!(err.to_string().contains("group 2 does not exist"));
        cfg.group = 1;
        assert!(cfg.validate("r", &PatternBudget::default()).is_ok());
    }

    #[test]
    fn test_occurrence_zero_rejected() {
        let mut cfg = RegexConfig::new(r"\d+");
        cfg.occurrence = 0;
        assert!(cfg.validate("r", &PatternBudget::default()).is_err());
    }

    #[test]
    fn test_cell_mode_needs_a_column() {
        let err = TableConfig::cell("序号").validate("t").unwrap_err();
        assert!(matches!(err, RuleError::MissingKey { key: "targetColumn", .. }));
        assert!(TableConfig::whole_table("序号", TableFormat::Json).validate("t").is_ok());
    }
}
