// src/extractors/anchor.rs
//! Keyword-anchor extraction: find a keyword, open a window of characters on
//! one or both sides of it, and pull the value out of that window.

use crate::extractors::pattern::{select_occurrence, PatternBudget, PatternFlags};
use crate::extractors::{Extraction, ExtractionStrategy};
use crate::result::{CharSpan, Trace};
use crate::rules::{AnchorConfig, Direction, ExtractMethod};
use crate::utils::error::ExtractError;
use crate::utils::text::{advance_chars, char_len, char_offset, fold_punctuation, preview, retreat_chars, FoldedText};

/// Pattern the regex method falls back to when the rule gives none: the first
/// run of non-whitespace in the window.
pub const DEFAULT_ANCHOR_PATTERN: &str = r"\S+";

const CONFIDENCE: u8 = 85;

// A terminator only counts once at least one character has been taken.
const DELIMITER_TERMINATORS: [char; 5] = ['\n', '。', '；', '，', ' '];

/// A located anchor, as byte offsets into the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnchorHit {
    start: usize,
    end: usize,
    keyword: String,
}

/// Candidate value inside the window. `offset` is the byte offset of `value`
/// within the window when the method knows it.
#[derive(Debug)]
struct Picked<'w> {
    value: &'w str,
    all: Vec<&'w str>,
    offset: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordAnchorMatcher {
    budget: PatternBudget,
}

impl KeywordAnchorMatcher {
    pub fn new(budget: PatternBudget) -> Self {
        Self { budget }
    }

    fn find_anchor(&self, text: &str, cfg: &AnchorConfig, trace: &mut Trace) -> Result<AnchorHit, ExtractError> {
        if cfg.anchor.is_empty() {
            return Err(ExtractError::config("anchor keyword must not be blank"));
        }

        let folded = cfg.normalize_punctuation.then(|| FoldedText::new(text));
        let haystack = folded.as_ref().map_or(text, |f| f.text.as_str());
        let flags = PatternFlags::new(cfg.ignore_case, false);

        // Alternatives are scanned in list order and the sort is stable, so
        // equal positions keep that order.
        let mut hits = Vec::new();
        for keyword in cfg.anchor.as_slice() {
            let needle = if folded.is_some() {
                fold_punctuation(keyword)
            } else {
                keyword.clone()
            };
            let re = self.budget.compile(&::regex::escape(&needle), flags)?;
            for m in self.budget.find_all(&re, haystack)? {
                hits.push((m.start(), m.end(), keyword));
            }
        }
        hits.sort_by_key(|&(start, _, _)| start);
        trace.note(format!("anchor '{}' found {} time(s)", cfg.anchor, hits.len()));

        if hits.is_empty() {
            return Err(ExtractError::not_found(format!("anchor '{}' not found", cfg.anchor)));
        }
        let Some(&(start, end, keyword)) = hits.get(cfg.anchor_occurrence.saturating_sub(1)) else {
            return Err(ExtractError::not_found(format!(
                "anchor '{}' occurs {} time(s) but occurrence {} was requested",
                cfg.anchor,
                hits.len(),
                cfg.anchor_occurrence
            )));
        };

        let (start, end) = match &folded {
            Some(f) => (f.to_original(start), f.to_original(end)),
            None => (start, end),
        };
        Ok(AnchorHit {
            start,
            end,
            keyword: keyword.clone(),
        })
    }

    fn by_regex<'w>(&self, window: &'w str, cfg: &AnchorConfig, trace: &mut Trace) -> Result<Picked<'w>, ExtractError> {
        let pattern = cfg.regex_pattern();
        let re = self.budget.compile(&pattern, cfg.flags())?;
        let matches = self.budget.find_all(&re, window)?;
        trace.note(format!(
            "pattern '{}' found {} match(es), occurrence {} requested",
            pattern,
            matches.len(),
            cfg.occurrence
        ));

        let selection = select_occurrence(matches, cfg.occurrence, cfg.return_all)?;
        Ok(Picked {
            value: selection.chosen.as_str(),
            all: selection.all.iter().map(|m| m.as_str()).collect(),
            offset: Some(selection.chosen.start()),
        })
    }

    fn by_line<'w>(&self, window: &'w str, cfg: &AnchorConfig, trace: &mut Trace) -> Result<Picked<'w>, ExtractError> {
        let mut offset = 0;
        let mut line = first_line(window);
        if window.starts_with(['\n', '\r']) {
            for candidate in window.split_inclusive('\n') {
                let content = candidate.trim_end_matches(['\n', '\r']);
                if !content.trim().is_empty() {
                    line = content;
                    break;
                }
                offset += candidate.len();
            }
        }
        trace.note(format!("line: {}", preview(line, 80)));
        self.refine(line, offset, cfg, trace)
    }

    fn by_delimiter<'w>(
        &self,
        window: &'w str,
        cfg: &AnchorConfig,
        trace: &mut Trace,
    ) -> Result<Picked<'w>, ExtractError> {
        let (segment, offset) = match window.find(cfg.delimiter.as_str()) {
            Some(pos) => {
                let from = pos + cfg.delimiter.len();
                let after = &window[from..];
                let end = after
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| DELIMITER_TERMINATORS.contains(c))
                    .map_or(after.len(), |(i, _)| i);
                (&after[..end], from)
            }
            None => {
                trace.note(format!("delimiter '{}' not in window, using whole window", cfg.delimiter));
                (window, 0)
            }
        };
        trace.note(format!("delimited text: {}", preview(segment, 80)));
        self.refine(segment, offset, cfg, trace)
    }

    /// Applies the optional pattern to a line or delimited segment. A pattern
    /// miss is a failure; the unrefined segment is never returned instead.
    fn refine<'w>(
        &self,
        segment: &'w str,
        offset: usize,
        cfg: &AnchorConfig,
        trace: &mut Trace,
    ) -> Result<Picked<'w>, ExtractError> {
        let Some(pattern) = cfg.user_pattern() else {
            return Ok(Picked {
                value: segment,
                all: Vec::new(),
                offset: Some(offset),
            });
        };

        let re = self.budget.compile(&pattern, cfg.flags())?;
        match self.budget.find_all(&re, segment)?.into_iter().next() {
            Some(m) => Ok(Picked {
                value: m.as_str(),
                all: Vec::new(),
                offset: Some(offset + m.start()),
            }),
            None => {
                trace.note(format!("pattern '{}' did not match, not falling back to raw text", pattern));
                Err(ExtractError::not_found(format!("pattern '{}' did not match near the anchor", pattern)))
            }
        }
    }
}

impl ExtractionStrategy for KeywordAnchorMatcher {
    type Config = AnchorConfig;

    fn name(&self) -> &'static str {
        "keyword-anchor"
    }

    fn extract(&self, text: &str, cfg: &AnchorConfig, trace: &mut Trace) -> Result<Extraction, ExtractError> {
        let anchor = self.find_anchor(text, cfg, trace)?;
        trace.note(format!(
            "anchor '{}' at chars {}..{}",
            anchor.keyword,
            char_offset(text, anchor.start),
            char_offset(text, anchor.end)
        ));
        tracing::debug!("Anchor '{}' located at byte {}", anchor.keyword, anchor.start);

        let (ws, we) = match cfg.direction {
            Direction::After => (anchor.end, advance_chars(text, anchor.end, cfg.max_distance)),
            Direction::Before => (retreat_chars(text, anchor.start, cfg.max_distance), anchor.start),
            Direction::Both => (
                retreat_chars(text, anchor.start, cfg.max_distance),
                advance_chars(text, anchor.end, cfg.max_distance),
            ),
        };
        let window = &text[ws..we];
        trace.note(format!(
            "window {:?} from char {}: {}",
            cfg.direction,
            char_offset(text, ws),
            preview(window, 100)
        ));
        if window.trim().is_empty() {
            return Err(ExtractError::not_found(format!(
                "search window {:?} anchor '{}' is empty",
                cfg.direction, anchor.keyword
            )));
        }

        let picked = match cfg.extract_method {
            ExtractMethod::Regex => self.by_regex(window, cfg, trace)?,
            ExtractMethod::Line => self.by_line(window, cfg, trace)?,
            ExtractMethod::Delimiter => self.by_delimiter(window, cfg, trace)?,
        };

        let (value, offset) = if cfg.trim {
            trim_tracked(picked.value, picked.offset)
        } else {
            (picked.value, picked.offset)
        };
        if value.trim().is_empty() {
            return Err(ExtractError::not_found("nothing extracted near the anchor"));
        }

        let span = reconcile(text, ws, we, value, offset);
        trace.note(format!("value '{}' at chars {}..{}", preview(value, 60), span.start, span.end));

        let all: Vec<String> = picked
            .all
            .into_iter()
            .map(|m| (if cfg.trim { m.trim() } else { m }).to_string())
            .collect();
        Ok(Extraction::new(value, CONFIDENCE).with_span(span).with_all_matches(all))
    }
}

fn first_line(window: &str) -> &str {
    window.split('\n').next().unwrap_or(window).trim_end_matches('\r')
}

/// Trims `value` and moves the known offset past any leading whitespace.
fn trim_tracked(value: &str, offset: Option<usize>) -> (&str, Option<usize>) {
    let leading = value.len() - value.trim_start().len();
    (value.trim(), offset.map(|o| o + leading))
}

/// Maps a value found in the window `text[ws..we]` back to a character span of
/// the original text. Tries the known offset, then a search of the window, then
/// a search of the text from the window start (kept only when it begins inside
/// the window), and finally settles for the window start.
fn reconcile(text: &str, ws: usize, we: usize, value: &str, known: Option<usize>) -> CharSpan {
    let located = known
        .map(|o| ws + o)
        .or_else(|| text[ws..we].find(value).map(|o| ws + o))
        .or_else(|| text[ws..].find(value).map(|o| ws + o).filter(|&s| s < we));

    match located {
        Some(byte_start) => {
            let start = char_offset(text, byte_start);
            CharSpan::new(start, start + char_len(value))
        }
        None => {
            tracing::debug!("Could not locate extracted value in text, using window start");
            let start = char_offset(text, ws);
            CharSpan::new(start, (start + char_len(value)).min(char_len(text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::config::Alternatives;

    const AMOUNT: &str = r"\d+(?:,\d{3})*(?:\.\d{2})?";

    fn run(text: &str, cfg: &AnchorConfig) -> Result<Extraction, ExtractError> {
        KeywordAnchorMatcher::default().extract(text, cfg, &mut Trace::new(true))
    }

    fn slice(text: &str, span: CharSpan) -> String {
        text.chars().skip(span.start).take(span.len()).collect()
    }

    #[test]
    fn test_amount_after_anchor() {
        let text = "甲乙双方约定：合同金额：人民币100,000.00元，分两期支付。";
        let mut cfg = AnchorConfig::new("合同金额");
        cfg.pattern = Some(AMOUNT.into());
        let out = run(text, &cfg).unwrap();
        assert_eq!(out.value, "100,000.00");
        assert_eq!(out.confidence, 85);
        assert_eq!(slice(text, out.span.unwrap()), "100,000.00");
    }

    #[test]
    fn test_earliest_alternative_wins() {
        let text = "总价：500元；合同金额：800元";
        let mut cfg = AnchorConfig::new("合同金额|总价");
        cfg.pattern = Some(r"\d+元".into());
        assert_eq!(run(text, &cfg).unwrap().value, "500元");

        cfg.anchor_occurrence = 2;
        assert_eq!(run(text, &cfg).unwrap().value, "800元");

        cfg.anchor_occurrence = 3;
        assert!(matches!(run(text, &cfg), Err(ExtractError::NotFound(_))));
    }

    #[test]
    fn test_tie_keeps_list_order() {
        let text = "合同金额：800元";
        let mut cfg = AnchorConfig::new("合同|合同金额");
        cfg.extract_method = ExtractMethod::Line;
        assert_eq!(run(text, &cfg).unwrap().value, "金额：800元");

        cfg.anchor = Alternatives::parse("合同金额|合同");
        assert_eq!(run(text, &cfg).unwrap().value, "：800元");
    }

    #[test]
    fn test_before_direction_respects_max_distance() {
        let text = "编号HT-2024-001（以下简称合同）";
        let mut cfg = AnchorConfig::new("（以下简称");
        cfg.direction = Direction::Before;
        cfg.max_distance = 11;
        cfg.pattern = Some(r"HT-\d{4}-\d{3}".into());
        assert_eq!(run(text, &cfg).unwrap().value, "HT-2024-001");

        cfg.max_distance = 5;
        assert!(run(text, &cfg).is_err());
    }

    #[test]
    fn test_both_direction_covers_anchor() {
        let text = "签订日期 2024年1月5日 地点";
        let mut cfg = AnchorConfig::new("日期");
        cfg.direction = Direction::Both;
        cfg.max_distance = 20;
        cfg.pattern = Some(r"\d{4}年\d{1,2}月\d{1,2}日".into());
        assert_eq!(run(text, &cfg).unwrap().value, "2024年1月5日");
    }

    #[test]
    fn test_anchor_missing() {
        let err = run("无关文本", &AnchorConfig::new("合同金额")).unwrap_err();
        assert_eq!(err.to_string(), "Not found: anchor '合同金额' not found");
    }

    #[test]
    fn test_blank_anchor_is_config_error() {
        let cfg = AnchorConfig {
            anchor: Alternatives::parse(" | "),
            ..AnchorConfig::new("x")
        };
        assert!(matches!(run("text", &cfg), Err(ExtractError::Config(_))));
    }

    #[test]
    fn test_empty_window_fails() {
        let err = run("内容在前面 合同金额   ", &AnchorConfig::new("合同金额")).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_default_pattern_takes_first_token() {
        let text = "项目名称 智慧园区建设 二期";
        let out = run(text, &AnchorConfig::new("项目名称")).unwrap();
        assert_eq!(out.value, "智慧园区建设");
    }

    #[test]
    fn test_occurrence_and_return_all() {
        let text = "付款节点：10%、30%、60%";
        let mut cfg = AnchorConfig::new("付款节点");
        cfg.pattern = Some(r"\d+%".into());
        cfg.occurrence = 2;
        assert_eq!(run(text, &cfg).unwrap().value, "30%");

        cfg.return_all = true;
        let out = run(text, &cfg).unwrap();
        assert_eq!(out.all_matches, vec!["10%", "30%", "60%"]);
        assert_eq!(out.value, out.all_matches[0]);

        cfg.return_all = false;
        cfg.occurrence = 5;
        let mut trace = Trace::new(true);
        let err = KeywordAnchorMatcher::default().extract(text, &cfg, &mut trace).unwrap_err();
        assert_eq!(err, ExtractError::OccurrenceOutOfRange { requested: 5, found: 3 });
        assert!(trace.lines().iter().any(|l| l.contains("found 3 match(es)")));
    }

    #[test]
    fn test_line_method() {
        let text = "乙方：\n  北京某某科技有限公司  \n地址：海淀区";
        let mut cfg = AnchorConfig::new("乙方：");
        cfg.extract_method = ExtractMethod::Line;
        let out = run(text, &cfg).unwrap();
        assert_eq!(out.value, "北京某某科技有限公司");
        assert_eq!(slice(text, out.span.unwrap()), "北京某某科技有限公司");
    }

    #[test]
    fn test_line_pattern_miss_is_failure() {
        let mut cfg = AnchorConfig::new("电话");
        cfg.extract_method = ExtractMethod::Line;
        cfg.pattern = Some(r"\d{11}".into());
        assert!(run("电话：待定\n13800138000", &cfg).is_err());
    }

    #[test]
    fn test_delimiter_method_stops_at_terminator() {
        let text = "联系人信息 姓名：张三，电话：13800138000";
        let mut cfg = AnchorConfig::new("联系人信息");
        cfg.extract_method = ExtractMethod::Delimiter;
        assert_eq!(run(text, &cfg).unwrap().value, "张三");

        cfg.delimiter = "电话：".into();
        cfg.pattern = Some(r"1\d{10}".into());
        assert_eq!(run(text, &cfg).unwrap().value, "13800138000");
    }

    #[test]
    fn test_ignore_case_anchor() {
        let mut cfg = AnchorConfig::new("contract no.");
        cfg.ignore_case = true;
        cfg.pattern = Some(r"[A-Z]{2}\d+\b".into());
        assert_eq!(run("Contract No. HT2024 signed", &cfg).unwrap().value, "HT2024");
    }

    #[test]
    fn test_normalized_punctuation_keeps_original_offsets() {
        let text = "合同编号:HT-001，金额（元）：500";
        let mut cfg = AnchorConfig::new("金额(元):");
        cfg.pattern = Some(r"\d+$".into());
        let out = run(text, &cfg).unwrap();
        assert_eq!(out.value, "500");
        assert_eq!(slice(text, out.span.unwrap()), "500");

        cfg.normalize_punctuation = false;
        assert!(matches!(run(text, &cfg), Err(ExtractError::NotFound(_))));
    }

    #[test]
    fn test_lazy_unless_greedy_requested() {
        let text = "期限：12个月，自2024年起";
        let mut cfg = AnchorConfig::new("期限：");
        cfg.pattern = Some(r"\d+.*月".into());
        assert_eq!(run(text, &cfg).unwrap().value, "12个月");
        cfg.pattern = Some(r"\d.+".into());
        assert_eq!(run(text, &cfg).unwrap().value, "12");
        cfg.greedy = true;
        assert_eq!(run(text, &cfg).unwrap().value, "12个月，自2024年起");

        // an explicit `?` disables the rewrite
        cfg.greedy = false;
        cfg.pattern = Some(r"\d.+年?".into());
        assert_eq!(run(text, &cfg).unwrap().value, "12个月，自2024年起");
    }

    #[test]
    fn test_reconcile_fallbacks() {
        let text = "abc def ghi";
        // found in window
        assert_eq!(reconcile(text, 4, 11, "ghi", None), CharSpan::new(8, 11));
        // straddles the window end, found by the bounded search
        assert_eq!(reconcile(text, 4, 9, "ghi", None), CharSpan::new(8, 11));
        // not found anywhere, window start with clamped end
        assert_eq!(reconcile(text, 8, 11, "zzzzzz", None), CharSpan::new(8, 11));
    }
}
