// src/tables/header.rs
//! Identifying a table by the column names it must carry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::text::char_len;

/// How a required column name was matched against an actual header.
/// Variants are listed in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchTier {
    Exact,
    IgnoreWhitespace,
    NormalizedBrackets,
    Contains,
}

impl MatchTier {
    pub const ALL: [MatchTier; 4] = [
        MatchTier::Exact,
        MatchTier::IgnoreWhitespace,
        MatchTier::NormalizedBrackets,
        MatchTier::Contains,
    ];

    /// Both arguments are expected to be trimmed already.
    fn accepts(self, header: &str, feature: &str) -> bool {
        match self {
            MatchTier::Exact => header == feature,
            MatchTier::IgnoreWhitespace => strip_whitespace(header) == strip_whitespace(feature),
            MatchTier::NormalizedBrackets => normalize_brackets(header) == normalize_brackets(feature),
            MatchTier::Contains => {
                // single characters would match almost any header
                (header.contains(feature) || feature.contains(header))
                    && char_len(header).min(char_len(feature)) >= 2
            }
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchTier::Exact => "exact",
            MatchTier::IgnoreWhitespace => "ignore-whitespace",
            MatchTier::NormalizedBrackets => "normalized-brackets",
            MatchTier::Contains => "contains",
        };
        f.write_str(name)
    }
}

/// One required column and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatch {
    pub column: String,
    pub header_index: usize,
    pub tier: MatchTier,
}

/// Required column names, parsed from a `|`-separated feature string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HeaderFeature {
    columns: Vec<String>,
}

impl HeaderFeature {
    pub fn parse(feature: &str) -> Self {
        let columns = feature
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Locates every required column in `headers`. Without `strict_order`,
    /// the best tier wins wherever it sits. With `strict_order`, each column
    /// takes the first header after the previous match that any tier
    /// accepts. Returns `None` as soon as one column cannot be found, or when
    /// no columns are required.
    pub fn resolve(&self, headers: &[String], strict_order: bool) -> Option<Vec<HeaderMatch>> {
        if self.columns.is_empty() {
            return None;
        }

        let trimmed: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
        let mut matches = Vec::with_capacity(self.columns.len());
        let mut next_start = 0;

        for column in &self.columns {
            let found = if strict_order {
                first_header_match(&trimmed, next_start, column)
            } else {
                best_tier_match(&trimmed, column)
            };

            match found {
                Some((header_index, tier)) => {
                    if tier != MatchTier::Exact {
                        tracing::debug!(
                            "Column '{}' matched header '{}' via {} tier",
                            column,
                            trimmed[header_index],
                            tier
                        );
                    }
                    next_start = header_index + 1;
                    matches.push(HeaderMatch {
                        column: column.clone(),
                        header_index,
                        tier,
                    });
                }
                None => {
                    tracing::debug!("Column '{}' not found in headers {:?}", column, trimmed);
                    return None;
                }
            }
        }
        Some(matches)
    }

    pub fn matches(&self, headers: &[String], strict_order: bool) -> bool {
        self.resolve(headers, strict_order).is_some()
    }
}

impl From<String> for HeaderFeature {
    fn from(value: String) -> Self {
        HeaderFeature::parse(&value)
    }
}

impl From<HeaderFeature> for String {
    fn from(value: HeaderFeature) -> Self {
        value.columns.join("|")
    }
}

impl fmt::Display for HeaderFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.columns.join("|"))
    }
}

// Tier-major: an exact header anywhere beats a fuzzy one earlier in the row.
fn best_tier_match(headers: &[&str], column: &str) -> Option<(usize, MatchTier)> {
    MatchTier::ALL.iter().find_map(|&tier| {
        headers
            .iter()
            .position(|header| tier.accepts(header, column))
            .map(|idx| (idx, tier))
    })
}

// Header-major from `from`: the first header that any tier accepts.
fn first_header_match(headers: &[&str], from: usize, column: &str) -> Option<(usize, MatchTier)> {
    headers.iter().enumerate().skip(from).find_map(|(idx, header)| {
        MatchTier::ALL
            .iter()
            .find(|tier| tier.accepts(header, column))
            .map(|&tier| (idx, tier))
    })
}

/// Convenience form taking the raw `a|b|c` feature string.
pub fn match_header_feature(headers: &[String], feature: &str, strict_order: bool) -> bool {
    HeaderFeature::parse(feature).matches(headers, strict_order)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize_brackets(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            '【' => '[',
            '】' => ']',
            '｛' => '{',
            '｝' => '}',
            other => other,
        })
        .collect()
}
