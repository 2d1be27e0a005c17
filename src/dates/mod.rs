//! Date extraction pipeline
//!
//! Turns OCR text fragments into validated, canonical dates:
//! pattern matching → validation → canonicalization → aggregation.

pub mod aggregate;
pub mod canonical;
pub mod patterns;
pub mod validate;

pub use aggregate::{aggregate, Aggregation};
pub use canonical::{canonicalize, CanonicalDate};
pub use patterns::{normalize_text, DateTemplate, PatternId, PatternMatcher};
pub use validate::{days_in_month, expand_two_digit_year, is_leap_year, DateValidator};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{ConfigError, DateParsingConfig, OcrSettings};
use crate::vision::TextFragment;

/// A validated date read from one fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateCandidate {
    /// Matched text after width normalization
    pub raw_text: String,
    pub pattern_id: PatternId,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Index of the source fragment in the image's OCR output
    pub fragment_index: usize,
    /// Byte range of the match in the normalized fragment text
    pub span: (usize, usize),
    /// OCR confidence of the source fragment
    pub confidence: f32,
}

/// Configured extraction pipeline for one set of date-parsing settings
#[derive(Debug, Clone)]
pub struct DateParser {
    matcher: PatternMatcher,
    confidence_threshold: f32,
}

impl DateParser {
    /// Build the pipeline, failing fast on bad configuration
    pub fn new(parsing: &DateParsingConfig, ocr: &OcrSettings) -> Result<Self, ConfigError> {
        parsing.validate()?;
        ocr.validate()?;

        let validator = DateValidator::new(parsing)?;
        let matcher = PatternMatcher::new(parsing.formats.clone(), validator);

        Ok(Self {
            matcher,
            confidence_threshold: ocr.confidence_threshold,
        })
    }

    /// Candidates from every fragment at or above the confidence threshold,
    /// in fragment order
    pub fn extract_candidates(&self, fragments: &[TextFragment]) -> Vec<DateCandidate> {
        let mut candidates = Vec::new();

        for (index, fragment) in fragments.iter().enumerate() {
            if fragment.confidence < self.confidence_threshold {
                debug!(
                    "Skipping fragment '{}' (confidence {:.2} < {:.2})",
                    fragment.text, fragment.confidence, self.confidence_threshold
                );
                continue;
            }

            let found = self.matcher.find_candidates(index, fragment);
            for candidate in &found {
                debug!(
                    "Parsed date: {} -> {:04}-{:02}-{:02} ({})",
                    candidate.raw_text, candidate.year, candidate.month, candidate.day, candidate.pattern_id
                );
            }
            candidates.extend(found);
        }

        candidates
    }

    /// Full pipeline for one image's fragments
    pub fn parse(&self, fragments: &[TextFragment]) -> Aggregation {
        aggregate(self.extract_candidates(fragments))
    }

    /// Best date in a free-standing piece of text, ignoring the threshold
    pub fn standardize(&self, text: &str) -> Option<CanonicalDate> {
        let fragment = TextFragment::new(text, 1.0);
        let mut found = self.matcher.find_candidates(0, &fragment);
        if found.is_empty() {
            return None;
        }
        Some(canonicalize(&found.remove(0)))
    }

    /// Whether a `YYYY-MM-DD` string passes this parser's validation
    pub fn validate_date(&self, iso: &str) -> bool {
        let mut parts = iso.splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        if y.len() != 4 || m.len() != 2 || d.len() != 2 {
            return false;
        }
        if ![y, m, d].iter().all(|part| part.bytes().all(|b| b.is_ascii_digit())) {
            return false;
        }
        self.matcher.validator().accepts_fields(y, m, d).is_some()
    }

    /// Parser settings for diagnostics output
    pub fn info(&self) -> serde_json::Value {
        let validator = self.matcher.validator();
        let (min_year, max_year) = validator.year_range();
        json!({
            "year_range": [min_year, max_year],
            "strict_validation": validator.is_strict(),
            "confidence_threshold": self.confidence_threshold,
            "patterns": self
                .matcher
                .templates()
                .iter()
                .map(|t| json!({ "template": t, "description": t.description() }))
                .collect::<Vec<_>>(),
        })
    }
}
