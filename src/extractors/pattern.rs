// src/extractors/pattern.rs
//! Shared pattern plumbing for the strategies: budgeted compilation and
//! evaluation of user-supplied regexes, the non-greedy rewrite, and
//! occurrence selection.

use regex::{Captures, Match, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::utils::error::ExtractError;

const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);
const DEFAULT_TIME_LIMIT_MS: u64 = 250;
const DEFAULT_MAX_MATCHES: usize = 10_000;

/// Flags applied when compiling a user pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    /// `^`/`$` match at line breaks and `.` matches `\n`.
    pub multi_line: bool,
}

impl PatternFlags {
    pub fn new(case_insensitive: bool, multi_line: bool) -> Self {
        Self { case_insensitive, multi_line }
    }
}

/// Upper bounds on compiling and running a user pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternBudget {
    /// Compiled program size limit in bytes.
    pub size_limit: usize,
    /// Wall-clock limit for enumerating the matches of one pattern.
    pub time_limit_ms: u64,
    /// Most matches one pattern may enumerate.
    pub max_matches: usize,
}

impl Default for PatternBudget {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

impl PatternBudget {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = limit.as_millis() as u64;
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn compile(&self, pattern: &str, flags: PatternFlags) -> Result<Regex, ExtractError> {
        RegexBuilder::new(pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.multi_line)
            .size_limit(self.size_limit)
            .dfa_size_limit(self.size_limit)
            .build()
            .map_err(|e| match e {
                regex::Error::CompiledTooBig(limit) => ExtractError::Budget(format!(
                    "pattern '{}' exceeds the compiled size limit of {} bytes",
                    pattern, limit
                )),
                other => ExtractError::config(format!("invalid pattern '{}': {}", pattern, other)),
            })
    }

    /// Every non-overlapping match of `re` in `haystack`, within budget.
    pub fn find_all<'h>(&self, re: &Regex, haystack: &'h str) -> Result<Vec<Match<'h>>, ExtractError> {
        let mut guard = self.guard(re);
        let mut out = Vec::new();
        for m in re.find_iter(haystack) {
            guard.tick(out.len())?;
            out.push(m);
        }
        Ok(out)
    }

    /// Every non-overlapping capture set of `re` in `haystack`, within budget.
    pub fn captures_all<'h>(&self, re: &Regex, haystack: &'h str) -> Result<Vec<Captures<'h>>, ExtractError> {
        let mut guard = self.guard(re);
        let mut out = Vec::new();
        for caps in re.captures_iter(haystack) {
            guard.tick(out.len())?;
            out.push(caps);
        }
        Ok(out)
    }

    fn guard<'a>(&'a self, re: &'a Regex) -> BudgetGuard<'a> {
        BudgetGuard {
            budget: self,
            pattern: re.as_str(),
            deadline: Instant::now() + self.time_limit(),
        }
    }
}

struct BudgetGuard<'a> {
    budget: &'a PatternBudget,
    pattern: &'a str,
    deadline: Instant,
}

impl BudgetGuard<'_> {
    fn tick(&mut self, seen: usize) -> Result<(), ExtractError> {
        if seen >= self.budget.max_matches {
            tracing::warn!("Pattern '{}' hit the match limit of {}", self.pattern, self.budget.max_matches);
            return Err(ExtractError::Budget(format!(
                "pattern '{}' produced more than {} matches",
                self.pattern, self.budget.max_matches
            )));
        }
        if Instant::now() >= self.deadline {
            tracing::warn!("Pattern '{}' ran past its {} ms budget", self.pattern, self.budget.time_limit_ms);
            return Err(ExtractError::Budget(format!(
                "pattern '{}' exceeded the {} ms evaluation limit",
                self.pattern, self.budget.time_limit_ms
            )));
        }
        Ok(())
    }
}

/// Rewrites `*`, `+` and `{m,n}` quantifiers to their lazy forms when the
/// pattern carries no `?` at all. Escaped characters and character classes
/// are left alone.
pub fn lazify(pattern: &str) -> String {
    if pattern.contains('?') {
        return pattern.to_string();
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    let mut in_repeat = false;

    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                    // \x{..} and \p{..} braces are not repetitions
                    if matches!(next, 'x' | 'p' | 'P') && chars.peek() == Some(&'{') {
                        for inner in chars.by_ref() {
                            out.push(inner);
                            if inner == '}' {
                                break;
                            }
                        }
                    }
                }
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' if !in_class => in_repeat = chars.peek().map_or(false, |n| n.is_ascii_digit()),
            '}' if in_repeat => {
                in_repeat = false;
                out.push('?');
            }
            '*' | '+' if !in_class => out.push('?'),
            _ => {}
        }
    }
    out
}

/// What occurrence selection picked out of an ordered candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    /// The chosen candidate (the first one in return-all mode).
    pub chosen: T,
    /// Every candidate, populated only in return-all mode.
    pub all: Vec<T>,
}

/// Picks the 1-based `occurrence` from `candidates`, or all of them.
pub fn select_occurrence<T: Clone>(
    mut candidates: Vec<T>,
    occurrence: usize,
    return_all: bool,
) -> Result<Selection<T>, ExtractError> {
    if candidates.is_empty() {
        return Err(ExtractError::not_found("pattern produced no matches"));
    }
    if return_all {
        let chosen = candidates[0].clone();
        return Ok(Selection { chosen, all: candidates });
    }
    if occurrence == 0 || occurrence > candidates.len() {
        return Err(ExtractError::OccurrenceOutOfRange {
            requested: occurrence,
            found: candidates.len(),
        });
    }
    Ok(Selection {
        chosen: candidates.swap_remove(occurrence - 1),
        all: Vec::new(),
    })
}
