//! Canonical `YYYY-MM-DD` form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::DateCandidate;

/// Standardized date, independent of the template that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalDate {
    pub iso_string: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CanonicalDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            iso_string: format!("{:04}-{:02}-{:02}", year, month, day),
            year,
            month,
            day,
        }
    }

    /// `None` only for triples that were never validated
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso_string)
    }
}

/// Canonicalize an accepted candidate
pub fn canonicalize(candidate: &DateCandidate) -> CanonicalDate {
    CanonicalDate::from_ymd(candidate.year, candidate.month, candidate.day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::PatternId;

    fn candidate(raw: &str, pattern_id: PatternId, y: i32, m: u32, d: u32) -> DateCandidate {
        DateCandidate {
            raw_text: raw.to_string(),
            pattern_id,
            year: y,
            month: m,
            day: d,
            fragment_index: 0,
            span: (0, raw.len()),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(CanonicalDate::from_ymd(2025, 6, 4).iso_string, "2025-06-04");
        assert_eq!(CanonicalDate::from_ymd(2021, 10, 29).to_string(), "2021-10-29");
    }

    #[test]
    fn test_same_triple_from_different_templates() {
        let dotted = canonicalize(&candidate("2025.6.4", PatternId::DotSeparated, 2025, 6, 4));
        let compact = canonicalize(&candidate("20250604", PatternId::Compact, 2025, 6, 4));
        let chinese = canonicalize(&candidate("2025年6月4日", PatternId::Chinese, 2025, 6, 4));
        assert_eq!(dotted, compact);
        assert_eq!(compact, chinese);
    }

    #[test]
    fn test_distinct_triples_distinct_strings() {
        // 2021-1-11 vs 2021-11-1 would collide without padding
        let a = CanonicalDate::from_ymd(2021, 1, 11);
        let b = CanonicalDate::from_ymd(2021, 11, 1);
        assert_ne!(a.iso_string, b.iso_string);
    }

    #[test]
    fn test_to_naive_date() {
        let date = CanonicalDate::from_ymd(2024, 2, 29);
        assert_eq!(date.to_naive_date(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(CanonicalDate::from_ymd(2023, 2, 29).to_naive_date(), None);
    }

    #[test]
    fn test_ordering_follows_calendar() {
        let mut dates = vec![
            CanonicalDate::from_ymd(2025, 1, 2),
            CanonicalDate::from_ymd(2024, 12, 31),
            CanonicalDate::from_ymd(2025, 1, 1),
        ];
        dates.sort();
        assert_eq!(dates[0].iso_string, "2024-12-31");
        assert_eq!(dates[2].iso_string, "2025-01-02");
    }
}
