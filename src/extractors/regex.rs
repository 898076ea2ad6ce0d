// src/extractors/regex.rs
use crate::extractors::pattern::{select_occurrence, PatternBudget};
use crate::extractors::{Extraction, ExtractionStrategy};
use crate::result::{CharSpan, Trace};
use crate::rules::RegexConfig;
use crate::utils::error::ExtractError;
use crate::utils::text::{char_len, char_offset};

const CONFIDENCE: u8 = 100;

/// Runs a user pattern over the whole text and returns one capture group.
#[derive(Debug, Clone, Default)]
pub struct RegexMatcher {
    budget: PatternBudget,
}

impl RegexMatcher {
    pub fn new(budget: PatternBudget) -> Self {
        Self { budget }
    }
}

impl ExtractionStrategy for RegexMatcher {
    type Config = RegexConfig;

    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, text: &str, cfg: &RegexConfig, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        if cfg.pattern.trim().is_empty() {
            return Err(ExtractError::config("pattern must not be blank"));
        }
        let re = self.budget.compile(&cfg.pattern, cfg.flags())?;
        if cfg.group >= re.captures_len() {
            return Err(ExtractError::config(format!(
                "group {} does not exist in pattern '{}'",
                cfg.group, cfg.pattern
            )));
        }

        // Matches where the selected group did not take part are skipped.
        let groups: Vec<_> = self
            .budget
            .captures_all(&re, text)?
            .iter()
            .filter_map(|caps| caps.get(cfg.group))
            .collect();
        trace.note(format!(
            "pattern '{}' group {} found {} match(es), occurrence {} requested",
            cfg.pattern,
            cfg.group,
            groups.len(),
            cfg.occurrence
        ));

        let selection = select_occurrence(groups, cfg.occurrence, cfg.return_all)?;
        let chosen = selection.chosen;
        let start = char_offset(text, chosen.start());
        let span = CharSpan::new(start, start + char_len(chosen.as_str()));

        Ok(Extraction::new(chosen.as_str(), CONFIDENCE)
            .with_span(span)
            .with_all_matches(selection.all.iter().map(|m| m.as_str().to_string()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, cfg: &RegexConfig) -> Result<Extraction, ExtractError> {
        RegexMatcher::default().extract(text, cfg, &mut Trace::new(false))
    }

    #[test]
    fn test_group_and_char_span() {
        let text = "签订日期：2024年3月15日";
        let mut cfg = RegexConfig::new(r"(\d{4})年(\d{1,2})月");
        cfg.group = 2;
        let out = run(text, &cfg).unwrap();
        assert_eq!(out.value, "3");
        assert_eq!(out.confidence, 100);
        assert_eq!(out.span, Some(CharSpan::new(10, 11)));
    }

    #[test]
    fn test_occurrence_out_of_range_reports_count() {
        let mut cfg = RegexConfig::new(r"\d+元");
        cfg.occurrence = 5;
        let err = run("首付100元，尾款200元", &cfg).unwrap_err();
        assert!(err.to_string().contains("only 2 matches found"));
    }

    #[test]
    fn test_return_all() {
        let mut cfg = RegexConfig::new(r"(\d+)元");
        cfg.group = 1;
        cfg.return_all = true;
        let out = run("首付100元，尾款200元", &cfg).unwrap();
        assert_eq!(out.all_matches, vec!["100", "200"]);
        assert_eq!(out.value, "100");
        assert_eq!(out.span, Some(CharSpan::new(2, 5)));
    }

    #[test]
    fn test_non_participating_group_skipped() {
        let mut cfg = RegexConfig::new(r"甲方|乙方：(\S+)");
        cfg.group = 1;
        let out = run("甲方 乙方：某某公司", &cfg).unwrap();
        assert_eq!(out.value, "某某公司");
    }

    #[test]
    fn test_flags() {
        let mut cfg = RegexConfig::new(r"^total: \d+");
        assert!(run("x\nTOTAL: 5", &cfg).is_err());
        cfg.multiline = true;
        cfg.ignore_case = true;
        assert_eq!(run("x\nTOTAL: 5", &cfg).unwrap().value, "TOTAL: 5");
    }

    #[test]
    fn test_missing_group_and_bad_pattern_are_config_errors() {
        let mut cfg = RegexConfig::new(r"\d+");
        cfg.group = 1;
        assert!(matches!(run("12", &cfg), Err(ExtractError::Config(_))));
        assert!(matches!(run("12", &RegexConfig::new("(")), Err(ExtractError::Config(_))));
    }
}
