//! Per-image recognition outcome

use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dates::{CanonicalDate, DateCandidate};
use crate::vision::{OcrError, TextFragment};

/// How recognition of one image ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStatus {
    /// At least one valid date found
    Recognized,
    /// OCR ran but no valid date was found
    NoDateFound,
    /// The image could not be read or the engine failed
    EngineFailure,
    /// The per-image time limit expired
    Timeout,
}

impl RecognitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionStatus::Recognized => "recognized",
            RecognitionStatus::NoDateFound => "no_date_found",
            RecognitionStatus::EngineFailure => "engine_failure",
            RecognitionStatus::Timeout => "timeout",
        }
    }
}

/// Severity bucket for display and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    None,
    Low,
    Medium,
    High,
}

impl WarningLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningLevel::None => "none",
            WarningLevel::Low => "low",
            WarningLevel::Medium => "medium",
            WarningLevel::High => "high",
        }
    }
}

/// Result of recognizing one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub image_path: PathBuf,
    pub success: bool,
    pub status: RecognitionStatus,
    /// Deduplicated dates, confidence descending
    pub dates_found: Vec<CanonicalDate>,
    /// Candidate retained for each entry of `dates_found`
    pub date_details: Vec<DateCandidate>,
    /// Best candidate's confidence, 0.0 on failure
    pub confidence: f32,
    /// Seconds spent on this image
    pub processing_time: f64,
    pub warning_message: Option<String>,
    /// Text of every OCR fragment, in engine order
    pub raw_text: Vec<String>,
    /// Image (width, height) after preprocessing, (0, 0) when never decoded
    pub image_size: (u32, u32),
    pub ocr_results: Vec<TextFragment>,
}

impl RecognitionResult {
    /// A failed result carrying no OCR output
    pub fn failure(
        image_path: impl Into<PathBuf>,
        status: RecognitionStatus,
        message: impl Into<String>,
        processing_time: f64,
    ) -> Self {
        Self {
            image_path: image_path.into(),
            success: false,
            status,
            dates_found: Vec::new(),
            date_details: Vec::new(),
            confidence: 0.0,
            processing_time,
            warning_message: Some(message.into()),
            raw_text: Vec::new(),
            image_size: (0, 0),
            ocr_results: Vec::new(),
        }
    }

    pub fn engine_failure(image_path: &Path, error: &OcrError, processing_time: f64) -> Self {
        Self::failure(
            image_path,
            RecognitionStatus::EngineFailure,
            format!("recognition failed: {}", error),
            processing_time,
        )
    }

    pub fn timeout(image_path: &Path, limit: Duration) -> Self {
        Self::failure(
            image_path,
            RecognitionStatus::Timeout,
            format!("timed out after {}s", limit.as_secs_f64()),
            limit.as_secs_f64(),
        )
    }

    /// Highest-confidence date
    pub fn best_date(&self) -> Option<&CanonicalDate> {
        self.dates_found.first()
    }

    pub fn warning_level(&self) -> WarningLevel {
        if !self.success {
            WarningLevel::High
        } else if self.confidence < 0.6 {
            WarningLevel::Medium
        } else if self.confidence < 0.8 {
            WarningLevel::Low
        } else {
            WarningLevel::None
        }
    }

    /// Structural conversion for export
    pub fn to_dict(&self) -> Value {
        let details: Vec<Value> = self
            .date_details
            .iter()
            .zip(&self.dates_found)
            .map(|(candidate, date)| {
                let position = self
                    .ocr_results
                    .get(candidate.fragment_index)
                    .map(|f| f.center())
                    .unwrap_or((0, 0));
                json!({
                    "original_text": candidate.raw_text,
                    "parsed_date": date.iso_string,
                    "pattern": candidate.pattern_id.as_str(),
                    "confidence": candidate.confidence,
                    "fragment_index": candidate.fragment_index,
                    "position": [position.0, position.1],
                })
            })
            .collect();

        let ocr_results: Vec<Value> = self
            .ocr_results
            .iter()
            .map(|f| {
                json!({
                    "text": f.text,
                    "confidence": f.confidence,
                    "area": f.area(),
                    "bounding_box": f.bounding_box.iter().map(|(x, y)| json!([x, y])).collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "image_path": self.image_path.display().to_string(),
            "success": self.success,
            "status": self.status.as_str(),
            "dates_found": self.dates_found.iter().map(|d| d.iso_string.as_str()).collect::<Vec<_>>(),
            "date_details": details,
            "confidence": self.confidence,
            "processing_time": self.processing_time,
            "warning_message": self.warning_message,
            "warning_level": self.warning_level().as_str(),
            "best_date": self.best_date().map(|d| d.iso_string.as_str()),
            "raw_text": self.raw_text,
            "image_size": [self.image_size.0, self.image_size.1],
            "ocr_results": ocr_results,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_dict())
    }
}
