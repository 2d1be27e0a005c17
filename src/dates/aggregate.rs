//! Per-image candidate merging

use std::collections::HashMap;

use super::canonical::{canonicalize, CanonicalDate};
use super::DateCandidate;

/// Deduplicated dates for one image, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One entry per distinct calendar date, confidence descending
    pub dates_found: Vec<CanonicalDate>,
    /// The retained candidate behind each entry of `dates_found`
    pub details: Vec<DateCandidate>,
    /// Confidence of the first entry, 0.0 when empty
    pub confidence: f32,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.dates_found.is_empty()
    }
}

/// Group candidates by canonical date and rank the groups
///
/// Within a group the highest confidence wins; ties keep the candidate seen
/// first. Groups are ordered by confidence with a stable sort, so equal
/// groups stay in discovery order.
pub fn aggregate(candidates: impl IntoIterator<Item = DateCandidate>) -> Aggregation {
    let mut groups: Vec<(CanonicalDate, DateCandidate)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let canonical = canonicalize(&candidate);
        match index.get(&canonical.iso_string) {
            Some(&i) => {
                if candidate.confidence > groups[i].1.confidence {
                    groups[i].1 = candidate;
                }
            }
            None => {
                index.insert(canonical.iso_string.clone(), groups.len());
                groups.push((canonical, candidate));
            }
        }
    }

    groups.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));

    let confidence = groups.first().map(|(_, c)| c.confidence).unwrap_or(0.0);
    let (dates_found, details): (Vec<_>, Vec<_>) = groups.into_iter().unzip();

    Aggregation {
        dates_found,
        details,
        confidence,
    }
}
