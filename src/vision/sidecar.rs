//! Sidecar OCR backend
//!
//! Replays OCR output stored as JSON next to each image, e.g.
//! `IMG_0412.jpg` → `IMG_0412.jpg.ocr.json`. The file holds an array of
//! `{ "text", "confidence", "bounding_box" }` objects in reading order.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{OcrEngine, OcrError, TextFragment};

/// Suffix appended to the image file name
pub const SIDECAR_SUFFIX: &str = ".ocr.json";

/// OCR engine backed by pre-computed sidecar files
#[derive(Debug, Clone, Default)]
pub struct SidecarOcrEngine;

impl SidecarOcrEngine {
    pub fn new() -> Self {
        Self
    }

    /// Path of the sidecar file for an image
    pub fn sidecar_path(image_path: &Path) -> PathBuf {
        let mut name = image_path.as_os_str().to_os_string();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }
}

impl OcrEngine for SidecarOcrEngine {
    fn name(&self) -> &str {
        "sidecar"
    }

    fn detect_text(&self, _image: &DynamicImage, source: &Path) -> Result<Vec<TextFragment>, OcrError> {
        let path = Self::sidecar_path(source);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| OcrError::EngineUnavailable(format!("{}: {}", path.display(), e)))?;

        let fragments: Vec<TextFragment> = serde_json::from_str(&content)
            .map_err(|e| OcrError::Decode(format!("{}: {}", path.display(), e)))?;

        if let Some(bad) = fragments.iter().find(|f| !(0.0..=1.0).contains(&f.confidence)) {
            return Err(OcrError::Decode(format!(
                "{}: confidence {} out of range for '{}'",
                path.display(),
                bad.confidence,
                bad.text
            )));
        }

        debug!("Sidecar {}: {} fragments", path.display(), fragments.len());
        Ok(fragments)
    }
}
