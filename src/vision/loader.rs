//! Image loading collaborator

use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use super::preprocess::apply_preprocessing;
use super::OcrError;
use crate::config::PreprocessingConfig;

/// Turns an image path into decoded pixels for the OCR engine
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<DynamicImage, OcrError>;
}

/// Decodes files with the `image` crate and applies preprocessing
#[derive(Debug, Clone, Default)]
pub struct FileImageLoader {
    preprocessing: PreprocessingConfig,
}

impl FileImageLoader {
    pub fn new(preprocessing: PreprocessingConfig) -> Self {
        Self { preprocessing }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, path: &Path) -> Result<DynamicImage, OcrError> {
        let image = image::open(path)
            .map_err(|e| OcrError::ImageUnreadable(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());

        Ok(apply_preprocessing(image, &self.preprocessing).image)
    }
}
