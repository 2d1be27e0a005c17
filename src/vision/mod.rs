//! Vision/OCR Layer
//!
//! Boundary to the OCR collaborator. The pipeline only sees text fragments;
//! which engine produced them is decided by whoever builds the recognizer.
//! Backends:
//! - Sidecar JSON files replaying previously captured OCR output
//! - Anything else implementing [`OcrEngine`]

pub mod loader;
pub mod preprocess;
pub mod sidecar;

pub use loader::{FileImageLoader, ImageLoader};
pub use preprocess::{apply_preprocessing, PreprocessResult};
pub use sidecar::SidecarOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while producing text fragments for one image
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine cannot run at all (missing model, missing sidecar, ...)
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The image file could not be opened or decoded
    #[error("image unreadable: {0}")]
    ImageUnreadable(String),

    /// The engine ran but its output could not be decoded
    #[error("failed to decode OCR output: {0}")]
    Decode(String),

    /// Recognition itself failed
    #[error("OCR recognition failed: {0}")]
    Recognition(String),
}

/// Detected text region from OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text content
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Bounding quadrilateral, clockwise from top-left
    #[serde(default)]
    pub bounding_box: [(f32, f32); 4],
}

impl TextFragment {
    /// Create a fragment with a degenerate bounding box
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box: [(0.0, 0.0); 4],
        }
    }

    /// Create a fragment with an explicit bounding box
    pub fn with_box(text: impl Into<String>, confidence: f32, bounding_box: [(f32, f32); 4]) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
        }
    }

    /// Integer centre point of the bounding box
    pub fn center(&self) -> (i32, i32) {
        let (sx, sy) = self
            .bounding_box
            .iter()
            .fold((0.0f32, 0.0f32), |(ax, ay), (x, y)| (ax + x, ay + y));
        ((sx / 4.0).floor() as i32, (sy / 4.0).floor() as i32)
    }

    /// Polygon area of the bounding box (shoelace formula)
    pub fn area(&self) -> f32 {
        let pts = &self.bounding_box;
        let mut twice = 0.0f32;
        for i in 0..pts.len() {
            let j = (i + 1) % pts.len();
            twice += pts[i].0 * pts[j].1 - pts[j].0 * pts[i].1;
        }
        twice.abs() / 2.0
    }
}

/// Text detection/recognition capability
///
/// Implementations must be safe to share across worker threads. An engine
/// with internal mutable state that cannot be driven concurrently returns
/// `false` from [`OcrEngine::is_reentrant`]; the batch processor then runs a
/// single worker and serializes calls.
pub trait OcrEngine: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &str;

    /// Detect and recognize text regions, ordered top-to-bottom, left-to-right
    ///
    /// `source` identifies where the pixels came from; engines are free to
    /// ignore it.
    fn detect_text(&self, image: &DynamicImage, source: &Path) -> Result<Vec<TextFragment>, OcrError>;

    /// Whether concurrent `detect_text` calls are allowed
    fn is_reentrant(&self) -> bool {
        true
    }
}
