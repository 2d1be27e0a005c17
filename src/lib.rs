//! DateLens - production date recognition for product packaging photos
//!
//! OCR output is scanned for printed dates, which are validated,
//! normalized to `YYYY-MM-DD` and aggregated per image and per batch.

pub mod batch;
pub mod config;
pub mod dates;
pub mod recognition;
pub mod storage;
pub mod vision;

pub use batch::{BatchProcessor, BatchResult};
pub use config::AppConfig;
pub use dates::{CanonicalDate, DateCandidate, DateParser};
pub use recognition::{DateRecognizer, RecognitionResult};
pub use vision::{OcrEngine, OcrError, TextFragment};
