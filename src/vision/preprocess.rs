//! Image enhancement before OCR
//!
//! Optional filters that help with low-contrast or small packaging prints.
//! The output is opaque to the date pipeline; it is only handed to the engine.

use image::{imageops, imageops::FilterType, DynamicImage, RgbaImage};
use tracing::debug;

use crate::config::PreprocessingConfig;

/// Result of preprocessing, with the (possibly upscaled) dimensions
pub struct PreprocessResult {
    /// Processed image
    pub image: DynamicImage,
    /// Width after scaling
    pub width: u32,
    /// Height after scaling
    pub height: u32,
}

/// Apply the configured filters to a decoded image
pub fn apply_preprocessing(image: DynamicImage, settings: &PreprocessingConfig) -> PreprocessResult {
    if !settings.enabled {
        let (width, height) = (image.width(), image.height());
        return PreprocessResult { image, width, height };
    }

    debug!(
        "Preprocessing: grayscale={}, invert={}, contrast={}, sharpen={}, scale={}",
        settings.grayscale, settings.invert, settings.contrast, settings.sharpen, settings.scale
    );

    let mut rgba = image.to_rgba8();

    // Upscale first so later filters work on the final resolution
    if settings.scale > 1 {
        let (w, h) = rgba.dimensions();
        rgba = imageops::resize(&rgba, w * settings.scale, h * settings.scale, FilterType::Triangle);
    }

    if (settings.contrast - 1.0).abs() > 0.01 {
        apply_contrast(&mut rgba, settings.contrast);
    }

    if settings.sharpen > 0.01 {
        rgba = apply_sharpen(&rgba, settings.sharpen);
    }

    if settings.grayscale {
        apply_grayscale(&mut rgba);
    }

    if settings.invert {
        apply_invert(&mut rgba);
    }

    let (width, height) = rgba.dimensions();
    PreprocessResult {
        image: DynamicImage::ImageRgba8(rgba),
        width,
        height,
    }
}

/// Contrast around the midpoint; factor > 1.0 increases contrast
fn apply_contrast(image: &mut RgbaImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            let val = pixel.0[c] as f32;
            pixel.0[c] = ((val - 128.0) * factor + 128.0).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Luminance grayscale, kept in RGBA layout
fn apply_grayscale(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let gray = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8;
        pixel.0[0] = gray;
        pixel.0[1] = gray;
        pixel.0[2] = gray;
    }
}

/// Invert RGB (light print on dark foil)
fn apply_invert(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            pixel.0[c] = 255 - pixel.0[c];
        }
    }
}

/// 3x3 cross sharpen kernel; edge pixels are left as-is
fn apply_sharpen(image: &RgbaImage, strength: f32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut result = image.clone();
    if w < 3 || h < 3 {
        return result;
    }

    let center_weight = 1.0 + 4.0 * strength;
    let neighbor_weight = -strength;

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            for c in 0..3 {
                let top = image.get_pixel(x, y - 1).0[c] as f32;
                let bottom = image.get_pixel(x, y + 1).0[c] as f32;
                let left = image.get_pixel(x - 1, y).0[c] as f32;
                let right = image.get_pixel(x + 1, y).0[c] as f32;
                let center = image.get_pixel(x, y).0[c] as f32;

                let sharpened = center * center_weight + (top + bottom + left + right) * neighbor_weight;
                result.get_pixel_mut(x, y).0[c] = sharpened.clamp(0.0, 255.0) as u8;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single(r: u8, g: u8, b: u8) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba([r, g, b, 255]))
    }

    #[test]
    fn test_preprocessing_disabled() {
        let img = DynamicImage::ImageRgba8(single(100, 150, 200));
        let result = apply_preprocessing(img, &PreprocessingConfig::default());
        assert_eq!(result.width, 1);
        assert_eq!(result.image.to_rgba8().get_pixel(0, 0).0, [100, 150, 200, 255]);
    }

    #[test]
    fn test_contrast_increase() {
        let mut img = single(100, 128, 200);
        apply_contrast(&mut img, 2.0);
        assert_eq!(img.get_pixel(0, 0).0, [72, 128, 255, 255]);
    }

    #[test]
    fn test_grayscale() {
        let mut img = single(255, 0, 0);
        apply_grayscale(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [76, 76, 76, 255]);
    }

    #[test]
    fn test_invert() {
        let mut img = single(0, 100, 255);
        apply_invert(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [255, 155, 0, 255]);
    }

    #[test]
    fn test_sharpen_flat_image_unchanged() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        let sharpened = apply_sharpen(&img, 1.0);
        assert_eq!(sharpened, img);
    }

    #[test]
    fn test_preprocessing_with_scale() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 255])));
        let settings = PreprocessingConfig {
            enabled: true,
            scale: 2,
            ..Default::default()
        };

        let result = apply_preprocessing(img, &settings);
        assert_eq!(result.width, 4);
        assert_eq!(result.height, 4);
        assert_eq!(result.image.width(), 4);
    }
}
