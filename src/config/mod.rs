//! Application Configuration
//!
//! Settings stored in TOML format. The configuration is an explicit value:
//! each component receives the section it needs at construction, and
//! [`AppConfig::validate`] rejects bad values before any image is touched.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::dates::DateTemplate;

/// Configuration problems detected at pipeline construction
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("year range is inverted: {0} > {1}")]
    InvertedYearRange(i32, i32),

    #[error("no date formats enabled")]
    NoFormats,

    #[error("date format '{0:?}' listed more than once")]
    DuplicateFormat(DateTemplate),

    #[error("confidence threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("per-image timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("preprocessing scale must be between 1 and 4, got {0}")]
    InvalidScale(u32),
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OCR settings
    pub ocr: OcrSettings,
    /// Date parsing settings
    pub date_parsing: DateParsingConfig,
    /// Image preprocessing settings
    pub preprocessing: PreprocessingConfig,
    /// Performance settings
    pub performance: PerformanceConfig,
    /// Warning settings
    pub warning: WarningConfig,
    /// Folder scanning settings
    pub scan: ScanConfig,
}

impl AppConfig {
    /// Check every section; the first problem found is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ocr.validate()?;
        self.date_parsing.validate()?;
        self.preprocessing.validate()?;
        self.performance.validate()?;
        if !(0.0..=1.0).contains(&self.warning.low_confidence_threshold) {
            return Err(ConfigError::InvalidThreshold(self.warning.low_confidence_threshold));
        }
        Ok(())
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Fragments below this confidence are ignored before date matching
    pub confidence_threshold: f32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
        }
    }
}

impl OcrSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }
        Ok(())
    }
}

/// Date parsing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateParsingConfig {
    /// Enabled templates, highest priority first
    pub formats: Vec<DateTemplate>,
    /// Accepted years, inclusive
    pub year_range: [i32; 2],
    /// When false, years outside `year_range` are accepted with a log line
    pub strict_validation: bool,
}

impl Default for DateParsingConfig {
    fn default() -> Self {
        Self {
            formats: DateTemplate::DEFAULT_ORDER.to_vec(),
            year_range: [2020, 2030],
            strict_validation: true,
        }
    }
}

impl DateParsingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [min, max] = self.year_range;
        if min > max {
            return Err(ConfigError::InvertedYearRange(min, max));
        }
        if self.formats.is_empty() {
            return Err(ConfigError::NoFormats);
        }
        for (i, format) in self.formats.iter().enumerate() {
            if self.formats[..i].contains(format) {
                return Err(ConfigError::DuplicateFormat(*format));
            }
        }
        Ok(())
    }
}

/// Image preprocessing applied before OCR
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Master switch
    pub enabled: bool,
    /// Convert to grayscale
    pub grayscale: bool,
    /// Invert colors (light print on dark background)
    pub invert: bool,
    /// Contrast factor, 1.0 = unchanged
    pub contrast: f32,
    /// Sharpen strength, 0.0 = off
    pub sharpen: f32,
    /// Integer upscale factor, 1 = unchanged
    pub scale: u32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            grayscale: false,
            invert: false,
            contrast: 1.0,
            sharpen: 0.0,
            scale: 1,
        }
    }
}

impl PreprocessingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=4).contains(&self.scale) {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

/// Performance-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads for batch processing
    pub max_workers: usize,
    /// Per-image time limit in seconds
    pub single_image_timeout_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            single_image_timeout_secs: 30,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.single_image_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Which warnings are attached to recognition results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningConfig {
    /// Warn when no date is found
    pub no_date_found: bool,
    /// Warn when the best date has low confidence
    pub low_confidence: bool,
    /// Threshold for the low-confidence warning
    pub low_confidence_threshold: f32,
}

impl Default for WarningConfig {
    fn default() -> Self {
        Self {
            no_date_found: true,
            low_confidence: true,
            low_confidence_threshold: 0.6,
        }
    }
}

/// Folder scanning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Descend into sub-folders
    pub recursive: bool,
    /// Accepted file extensions, lowercase without the dot
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: ["jpg", "jpeg", "png", "bmp", "tiff", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!((config.ocr.confidence_threshold - 0.5).abs() < 0.01);

        assert_eq!(
            config.date_parsing.formats,
            vec![DateTemplate::Separated, DateTemplate::Compact, DateTemplate::Chinese]
        );
        assert_eq!(config.date_parsing.year_range, [2020, 2030]);
        assert!(config.date_parsing.strict_validation);

        assert!(!config.preprocessing.enabled);
        assert_eq!(config.preprocessing.scale, 1);

        assert_eq!(config.performance.max_workers, 4);
        assert_eq!(config.performance.single_image_timeout_secs, 30);

        assert!(config.warning.no_date_found);
        assert!((config.warning.low_confidence_threshold - 0.6).abs() < 0.01);

        assert!(config.scan.recursive);
        assert!(config.scan.extensions.contains(&"jpg".to_string()));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.date_parsing.formats = vec![DateTemplate::Chinese, DateTemplate::ShortSeparated];
        config.performance.max_workers = 2;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.date_parsing.formats, config.date_parsing.formats);
        assert_eq!(parsed.performance.max_workers, 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [date_parsing]
            year_range = [2018, 2026]
            formats = ["compact", "separated"]
            "#,
        )
        .unwrap();

        assert_eq!(parsed.date_parsing.year_range, [2018, 2026]);
        assert_eq!(parsed.date_parsing.formats, vec![DateTemplate::Compact, DateTemplate::Separated]);
        assert!(parsed.date_parsing.strict_validation);
        assert_eq!(parsed.performance.max_workers, 4);
    }

    #[test]
    fn test_unknown_format_rejected_by_parser() {
        let result: std::result::Result<AppConfig, _> = toml::from_str(
            r#"
            [date_parsing]
            formats = ["julian"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_inverted_year_range() {
        let mut config = AppConfig::default();
        config.date_parsing.year_range = [2030, 2020];
        assert_eq!(config.validate(), Err(ConfigError::InvertedYearRange(2030, 2020)));
    }

    #[test]
    fn test_validate_empty_formats() {
        let mut config = AppConfig::default();
        config.date_parsing.formats.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoFormats));
    }

    #[test]
    fn test_validate_duplicate_format() {
        let mut config = AppConfig::default();
        config.date_parsing.formats.push(DateTemplate::Compact);
        assert_eq!(config.validate(), Err(ConfigError::DuplicateFormat(DateTemplate::Compact)));
    }

    #[test]
    fn test_validate_threshold_workers_timeout() {
        let mut config = AppConfig::default();
        config.ocr.confidence_threshold = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(1.5)));

        let mut config = AppConfig::default();
        config.performance.max_workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

        let mut config = AppConfig::default();
        config.performance.single_image_timeout_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let mut config = AppConfig::default();
        config.preprocessing.scale = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidScale(0)));
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.date_parsing.year_range, loaded.date_parsing.year_range);
        assert_eq!(config.performance.max_workers, loaded.performance.max_workers);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
