//! Date Recognition
//!
//! Top-level per-image call: load the image, run the injected OCR engine,
//! extract dates, and package everything as a [`RecognitionResult`].
//! Failures of a single image never escape as errors; they become failed
//! results with a warning that says what went wrong.

pub mod result;

pub use result::{RecognitionResult, RecognitionStatus, WarningLevel};

use parking_lot::Mutex;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigError, WarningConfig};
use crate::dates::DateParser;
use crate::vision::{FileImageLoader, ImageLoader, OcrEngine, TextFragment};

/// Recognizes production dates in single images
pub struct DateRecognizer {
    parser: DateParser,
    engine: Arc<dyn OcrEngine>,
    loader: Arc<dyn ImageLoader>,
    /// Serializes engine calls when the engine is not reentrant
    engine_lock: Option<Mutex<()>>,
    warnings: WarningConfig,
}

impl DateRecognizer {
    /// Build a recognizer; the configuration is validated here
    pub fn new(config: &AppConfig, engine: Arc<dyn OcrEngine>) -> Result<Self, ConfigError> {
        config.validate()?;

        let parser = DateParser::new(&config.date_parsing, &config.ocr)?;
        let engine_lock = (!engine.is_reentrant()).then(|| Mutex::new(()));

        info!(
            "Date recognizer ready: engine={}, formats={:?}, years={:?}",
            engine.name(),
            config.date_parsing.formats,
            config.date_parsing.year_range
        );

        Ok(Self {
            parser,
            engine,
            loader: Arc::new(FileImageLoader::new(config.preprocessing.clone())),
            engine_lock,
            warnings: config.warning.clone(),
        })
    }

    /// Replace the image loader
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    pub fn parser(&self) -> &DateParser {
        &self.parser
    }

    /// Recognize dates in one image
    pub fn recognize(&self, image_path: &Path) -> RecognitionResult {
        self.recognize_with_start(image_path, || {})
    }

    /// Recognize dates in one image, calling `on_start` once the engine is
    /// available to this call
    ///
    /// For a non-reentrant engine that is after the engine lock is held, so
    /// time spent queued behind another image is not part of this image's
    /// processing time.
    pub fn recognize_with_start(&self, image_path: &Path, on_start: impl FnOnce()) -> RecognitionResult {
        let _guard = self.engine_lock.as_ref().map(|lock| lock.lock());
        on_start();

        let start = Instant::now();
        debug!("Recognizing {}", image_path.display());

        let image = match self.loader.load(image_path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to load {}: {}", image_path.display(), e);
                return RecognitionResult::engine_failure(image_path, &e, start.elapsed().as_secs_f64());
            }
        };
        let image_size = (image.width(), image.height());

        let fragments = match self.engine.detect_text(&image, image_path) {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("OCR failed for {}: {}", image_path.display(), e);
                return RecognitionResult::engine_failure(image_path, &e, start.elapsed().as_secs_f64());
            }
        };

        self.build_result(image_path, fragments, image_size, start)
    }

    /// Run the date pipeline on fragments that are already available
    pub fn recognize_fragments(
        &self,
        image_path: &Path,
        fragments: Vec<TextFragment>,
        image_size: (u32, u32),
    ) -> RecognitionResult {
        self.build_result(image_path, fragments, image_size, Instant::now())
    }

    fn build_result(
        &self,
        image_path: &Path,
        fragments: Vec<TextFragment>,
        image_size: (u32, u32),
        start: Instant,
    ) -> RecognitionResult {
        let aggregation = self.parser.parse(&fragments);
        let success = !aggregation.is_empty();
        let status = if success {
            RecognitionStatus::Recognized
        } else {
            RecognitionStatus::NoDateFound
        };

        let warning_message = self.warning_message(status, aggregation.confidence, fragments.is_empty());

        info!(
            "Recognized {}: {} date(s), confidence {:.2}",
            image_path.display(),
            aggregation.dates_found.len(),
            aggregation.confidence
        );

        RecognitionResult {
            image_path: image_path.to_path_buf(),
            success,
            status,
            dates_found: aggregation.dates_found,
            date_details: aggregation.details,
            confidence: aggregation.confidence,
            processing_time: start.elapsed().as_secs_f64(),
            warning_message,
            raw_text: fragments.iter().map(|f| f.text.clone()).collect(),
            image_size,
            ocr_results: fragments,
        }
    }

    fn warning_message(&self, status: RecognitionStatus, confidence: f32, no_text: bool) -> Option<String> {
        match status {
            RecognitionStatus::NoDateFound if self.warnings.no_date_found => Some(if no_text {
                "no text detected".to_string()
            } else {
                "no valid date found in recognized text".to_string()
            }),
            RecognitionStatus::Recognized
                if self.warnings.low_confidence && confidence < self.warnings.low_confidence_threshold =>
            {
                Some(format!("low recognition confidence: {:.2}", confidence))
            }
            _ => None,
        }
    }

    /// Recognizer settings for diagnostics output
    pub fn info(&self) -> serde_json::Value {
        json!({
            "ocr_engine": self.engine.name(),
            "engine_reentrant": self.engine.is_reentrant(),
            "date_parser": self.parser.info(),
            "warnings": {
                "no_date_found": self.warnings.no_date_found,
                "low_confidence": self.warnings.low_confidence,
                "low_confidence_threshold": self.warnings.low_confidence_threshold,
            },
        })
    }
}
