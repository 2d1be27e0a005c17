//! Calendar and plausibility checks for parsed (year, month, day) triples

use tracing::debug;

use crate::config::{ConfigError, DateParsingConfig};

/// Two-digit years below this value land in the 2000s, the rest in the 1900s
pub const TWO_DIGIT_PIVOT: u32 = 50;

/// Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in a month, 0 for a month outside 1..=12
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Whether the triple names a day of the proleptic Gregorian calendar
pub fn is_calendar_date(year: i32, month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

/// Expand `yy` with the pivot rule: 00-49 → 20yy, 50-99 → 19yy
pub fn expand_two_digit_year(yy: u32) -> Option<i32> {
    match yy {
        0..=49 => Some(2000 + yy as i32),
        50..=99 => Some(1900 + yy as i32),
        _ => None,
    }
}

/// Accept/reject decision for candidate dates
#[derive(Debug, Clone)]
pub struct DateValidator {
    min_year: i32,
    max_year: i32,
    strict: bool,
}

impl DateValidator {
    pub fn new(config: &DateParsingConfig) -> Result<Self, ConfigError> {
        let [min_year, max_year] = config.year_range;
        if min_year > max_year {
            return Err(ConfigError::InvertedYearRange(min_year, max_year));
        }
        Ok(Self {
            min_year,
            max_year,
            strict: config.strict_validation,
        })
    }

    pub fn year_range(&self) -> (i32, i32) {
        (self.min_year, self.max_year)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Calendar validity is always required; the year range only in strict mode
    pub fn accepts(&self, year: i32, month: u32, day: u32) -> bool {
        if !is_calendar_date(year, month, day) {
            debug!("Rejected {:04}-{:02}-{:02}: not a calendar date", year, month, day);
            return false;
        }

        if !(self.min_year..=self.max_year).contains(&year) {
            if self.strict {
                debug!(
                    "Rejected {:04}-{:02}-{:02}: year outside {}..={}",
                    year, month, day, self.min_year, self.max_year
                );
                return false;
            }
            debug!(
                "Accepted {:04}-{:02}-{:02} with year outside {}..={} (non-strict)",
                year, month, day, self.min_year, self.max_year
            );
        }

        true
    }

    /// Parse numeric captures and validate; any malformed field rejects
    pub fn accepts_fields(&self, year: &str, month: &str, day: &str) -> Option<(i32, u32, u32)> {
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        let day: u32 = day.parse().ok()?;
        self.accepts(year, month, day).then_some((year, month, day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(min: i32, max: i32, strict: bool) -> DateValidator {
        DateValidator::new(&DateParsingConfig {
            year_range: [min, max],
            strict_validation: strict,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(2100));
        assert!(is_leap_year(2000));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 13), 0);
        assert_eq!(days_in_month(2025, 0), 0);
    }

    #[test]
    fn test_february_29th() {
        let v = validator(2020, 2030, true);
        assert!(v.accepts(2024, 2, 29));
        assert!(!v.accepts(2023, 2, 29));
    }

    #[test]
    fn test_month_and_day_bounds() {
        let v = validator(2020, 2030, true);
        assert!(!v.accepts(2025, 0, 10));
        assert!(!v.accepts(2025, 13, 10));
        assert!(!v.accepts(2025, 6, 0));
        assert!(!v.accepts(2025, 6, 31));
        assert!(v.accepts(2025, 6, 30));
    }

    #[test]
    fn test_year_range_inclusive_both_ends() {
        let v = validator(2020, 2030, true);
        assert!(v.accepts(2020, 1, 1));
        assert!(v.accepts(2030, 12, 31));
        assert!(!v.accepts(2031, 1, 1));
        assert!(!v.accepts(2019, 12, 31));
    }

    #[test]
    fn test_non_strict_relaxes_year_range_only() {
        let v = validator(2020, 2030, false);
        assert!(v.accepts(2031, 1, 1));
        assert!(!v.accepts(2031, 2, 30));
    }

    #[test]
    fn test_malformed_fields_rejected() {
        let v = validator(2020, 2030, true);
        assert_eq!(v.accepts_fields("2025", "06", "04"), Some((2025, 6, 4)));
        assert_eq!(v.accepts_fields("2025", "O6", "04"), None);
        assert_eq!(v.accepts_fields("", "06", "04"), None);
    }

    #[test]
    fn test_two_digit_pivot() {
        assert_eq!(expand_two_digit_year(0), Some(2000));
        assert_eq!(expand_two_digit_year(25), Some(2025));
        assert_eq!(expand_two_digit_year(49), Some(2049));
        assert_eq!(expand_two_digit_year(50), Some(1950));
        assert_eq!(expand_two_digit_year(99), Some(1999));
        assert_eq!(expand_two_digit_year(100), None);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = DateValidator::new(&DateParsingConfig {
            year_range: [2030, 2020],
            ..Default::default()
        });
        assert_eq!(result.unwrap_err(), ConfigError::InvertedYearRange(2030, 2020));
    }
}
