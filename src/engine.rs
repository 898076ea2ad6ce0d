// src/engine.rs
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::extractors::{
    ContextBoundaryMatcher, Extraction, ExtractionStrategy, KeywordAnchorMatcher, PatternBudget, RegexMatcher,
    TableCellMatcher,
};
use crate::result::{ExtractionResult, Trace};
use crate::rules::{ExtractionRule, RuleConfig};
use crate::utils::error::ExtractError;

/// Engine settings. Both fields can be supplied from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Collect a step-by-step trace into `debugInfo`.
    pub debug: bool,
    pub budget: PatternBudget,
}

/// Dispatches rules to their strategies. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    anchor: KeywordAnchorMatcher,
    boundary: ContextBoundaryMatcher,
    regex: RegexMatcher,
    table: TableCellMatcher,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            anchor: KeywordAnchorMatcher::new(config.budget.clone()),
            boundary: ContextBoundaryMatcher::new(config.budget.clone()),
            regex: RegexMatcher::new(config.budget.clone()),
            table: TableCellMatcher::new(),
            config,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn with_budget(self, budget: PatternBudget) -> Self {
        Self::new(EngineConfig {
            budget,
            ..self.config
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates one rule. Every failure comes back as an unsuccessful result.
    pub fn extract(&self, text: &str, rule: &ExtractionRule) -> ExtractionResult {
        let mut trace = Trace::new(self.config.debug);
        trace.note(format!("rule '{}' ({})", rule.id, rule.type_name()));

        match self.dispatch(text, rule, &mut trace) {
            Ok(extraction) => {
                let result = ExtractionResult::from_extraction(extraction, trace);
                if result.success {
                    tracing::debug!("Rule '{}' extracted {:?}", rule.id, result.value);
                }
                result
            }
            Err(err) => {
                tracing::debug!("Rule '{}' failed: {}", rule.id, err);
                trace.note(format!("failed: {}", err));
                ExtractionResult::failure(&err, trace)
            }
        }
    }

    /// Evaluates enabled rules by descending priority (ties keep input order)
    /// and returns the first success, tagged with its rule id. When every
    /// rule fails, the last failure is returned as is.
    pub fn extract_with_rules(&self, text: &str, rules: &[ExtractionRule]) -> ExtractionResult {
        let ordered = ordered_enabled(rules);
        let mut last_failure = None;

        for rule in ordered {
            let mut result = self.extract(text, rule);
            if result.success {
                tracing::info!("Rule '{}' (priority {}) succeeded", rule.id, rule.priority);
                result.matched_rule_id = Some(rule.id.clone());
                return result;
            }
            last_failure = Some(result);
        }

        match last_failure {
            Some(result) => {
                tracing::info!("All {} enabled rule(s) failed", rules.iter().filter(|r| r.enabled).count());
                result
            }
            None => ExtractionResult::failure(
                &ExtractError::config("no enabled rules to evaluate"),
                Trace::new(self.config.debug),
            ),
        }
    }

    /// Evaluates every enabled rule, in priority order, and keeps every result.
    pub fn extract_each(&self, text: &str, rules: &[ExtractionRule]) -> Vec<(String, ExtractionResult)> {
        ordered_enabled(rules)
            .into_iter()
            .map(|rule| {
                let mut result = self.extract(text, rule);
                if result.success {
                    result.matched_rule_id = Some(rule.id.clone());
                }
                (rule.id.clone(), result)
            })
            .collect()
    }

    fn dispatch(&self, text: &str, rule: &ExtractionRule, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::config("input text is blank"));
        }
        if !rule.enabled {
            return Err(ExtractError::config(format!("rule '{}' is disabled", rule.id)));
        }

        match &rule.config {
            RuleConfig::Anchor(cfg) => run(&self.anchor, text, cfg, trace),
            RuleConfig::Boundary(cfg) => run(&self.boundary, text, cfg, trace),
            RuleConfig::Regex(cfg) => run(&self.regex, text, cfg, trace),
            RuleConfig::Table(cfg) => run(&self.table, text, cfg, trace),
            RuleConfig::Unsupported { rule_type } => Err(ExtractError::config(format!(
                "rule type '{}' is not supported",
                rule_type
            ))),
        }
    }
}

fn run<S: ExtractionStrategy>(
    strategy: &S,
    text: &str,
    cfg: &S::Config,
    trace: &mut Trace,
) -> Result<Extraction, ExtractError> {
    trace.note(format!("strategy: {}", strategy.name()));
    strategy.extract(text, cfg, trace)
}

// sort_by_key is stable, so equal priorities keep their input order
fn ordered_enabled(rules: &[ExtractionRule]) -> Vec<&ExtractionRule> {
    let mut ordered: Vec<&ExtractionRule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| Reverse(r.priority));
    ordered
}
