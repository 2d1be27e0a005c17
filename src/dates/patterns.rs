//! Date template matching over OCR text
//!
//! Fragment text is NFKC-normalized first so full-width digits and
//! separators (`２０２５／０６／２４`) match the ASCII templates. Templates run
//! in priority order and a span claimed by one match suppresses every later
//! overlapping match.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::validate::{expand_two_digit_year, DateValidator};
use super::DateCandidate;
use crate::vision::TextFragment;

lazy_static! {
    static ref SEPARATED: Regex = Regex::new(r"([0-9]{4})([./-])([0-9]{1,2})([./-])([0-9]{1,2})").unwrap();
    static ref COMPACT: Regex = Regex::new(r"([0-9]{4})([0-9]{2})([0-9]{2})").unwrap();
    static ref CHINESE: Regex =
        Regex::new(r"([0-9]{4})\s*年\s*([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日").unwrap();
    static ref SHORT_SEPARATED: Regex = Regex::new(r"([0-9]{2})([./-])([0-9]{1,2})([./-])([0-9]{1,2})").unwrap();
}

/// Template families that can be enabled in `date_parsing.formats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTemplate {
    /// `YYYY.MM.DD`, `YYYY-MM-DD`, `YYYY/MM/DD`
    Separated,
    /// `YYYYMMDD`
    Compact,
    /// `YYYY年MM月DD日`
    Chinese,
    /// `YY.MM.DD` and friends, two-digit year expanded by pivot
    ShortSeparated,
}

impl DateTemplate {
    pub const DEFAULT_ORDER: [DateTemplate; 3] =
        [DateTemplate::Separated, DateTemplate::Compact, DateTemplate::Chinese];

    fn regex(&self) -> &'static Regex {
        match self {
            DateTemplate::Separated => &SEPARATED,
            DateTemplate::Compact => &COMPACT,
            DateTemplate::Chinese => &CHINESE,
            DateTemplate::ShortSeparated => &SHORT_SEPARATED,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DateTemplate::Separated => "YYYY.MM.DD, YYYY-MM-DD, YYYY/MM/DD",
            DateTemplate::Compact => "YYYYMMDD",
            DateTemplate::Chinese => "YYYY年MM月DD日",
            DateTemplate::ShortSeparated => "YY.MM.DD, YY-MM-DD, YY/MM/DD",
        }
    }
}

/// Which concrete form produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternId {
    DotSeparated,
    DashSeparated,
    SlashSeparated,
    Compact,
    Chinese,
    ShortSeparated,
}

impl PatternId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::DotSeparated => "dot-separated",
            PatternId::DashSeparated => "dash-separated",
            PatternId::SlashSeparated => "slash-separated",
            PatternId::Compact => "compact",
            PatternId::Chinese => "chinese",
            PatternId::ShortSeparated => "short-separated",
        }
    }

    fn from_separator(sep: &str) -> Option<Self> {
        match sep {
            "." => Some(PatternId::DotSeparated),
            "-" => Some(PatternId::DashSeparated),
            "/" => Some(PatternId::SlashSeparated),
            _ => None,
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NFKC-normalize OCR text (full-width → half-width)
pub fn normalize_text(text: &str) -> String {
    text.nfkc().collect()
}

/// Applies enabled templates in priority order
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    templates: Vec<DateTemplate>,
    validator: DateValidator,
}

impl PatternMatcher {
    pub fn new(templates: Vec<DateTemplate>, validator: DateValidator) -> Self {
        Self { templates, validator }
    }

    pub fn templates(&self) -> &[DateTemplate] {
        &self.templates
    }

    pub fn validator(&self) -> &DateValidator {
        &self.validator
    }

    /// Find validated candidates in one fragment, ordered by position
    ///
    /// Matches that fail validation produce nothing and do not claim their
    /// span, so a lower-priority template may still read that text.
    pub fn find_candidates(&self, fragment_index: usize, fragment: &TextFragment) -> Vec<DateCandidate> {
        let text = normalize_text(&fragment.text);
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut candidates = Vec::new();

        for template in &self.templates {
            for caps in template.regex().captures_iter(&text) {
                let Some(whole) = caps.get(0) else { continue };
                let span = (whole.start(), whole.end());

                if !digit_bounded(&text, span) {
                    continue;
                }
                if claimed.iter().any(|c| overlaps(*c, span)) {
                    debug!("'{}' suppressed by earlier match", whole.as_str());
                    continue;
                }

                let Some((pattern_id, year, month, day)) = self.read_fields(*template, &caps) else {
                    continue;
                };

                claimed.push(span);
                candidates.push(DateCandidate {
                    raw_text: whole.as_str().to_string(),
                    pattern_id,
                    year,
                    month,
                    day,
                    fragment_index,
                    span,
                    confidence: fragment.confidence,
                });
            }
        }

        candidates.sort_by_key(|c| c.span.0);
        candidates
    }

    /// Pull and validate (year, month, day) from one match
    fn read_fields(&self, template: DateTemplate, caps: &Captures) -> Option<(PatternId, i32, u32, u32)> {
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

        let (pattern_id, year, month, day) = match template {
            DateTemplate::Separated => {
                if group(2) != group(4) {
                    return None;
                }
                (PatternId::from_separator(group(2))?, group(1).to_string(), group(3), group(5))
            }
            DateTemplate::ShortSeparated => {
                if group(2) != group(4) {
                    return None;
                }
                let yy: u32 = group(1).parse().ok()?;
                let year = expand_two_digit_year(yy)?;
                (PatternId::ShortSeparated, year.to_string(), group(3), group(5))
            }
            DateTemplate::Compact => (PatternId::Compact, group(1).to_string(), group(2), group(3)),
            DateTemplate::Chinese => (PatternId::Chinese, group(1).to_string(), group(2), group(3)),
        };

        let (year, month, day) = self.validator.accepts_fields(&year, month, day)?;
        Some((pattern_id, year, month, day))
    }
}

/// No ASCII digit directly before or after the span
fn digit_bounded(text: &str, (start, end): (usize, usize)) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
}

fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}
