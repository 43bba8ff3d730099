//! Image to pixel vector: grayscale, resize, flatten
//!
//! Every step is a pure function. The luma weights and the Lanczos filter are
//! fixed; changing either changes retrieval results.

use crate::types::{ExtractionError, FeatureExtractor, FeatureVector};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use std::path::Path;

/// R, G, B weights of the luma conversion (ITU-R BT.601 derived)
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Default target size
pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 300;

/// Convert to 8-bit luma, dropping any alpha channel
///
/// The weighted sum is truncated to `u8`, not rounded.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = LUMA_WEIGHTS[0] * f64::from(r)
            + LUMA_WEIGHTS[1] * f64::from(g)
            + LUMA_WEIGHTS[2] * f64::from(b);
        gray.put_pixel(x, y, Luma([luma as u8]));
    }

    gray
}

/// Lanczos resample to exactly `width x height`
pub fn resize(gray: &GrayImage, width: u32, height: u32) -> GrayImage {
    if gray.dimensions() == (width, height) {
        return gray.clone();
    }
    imageops::resize(gray, width, height, FilterType::Lanczos3)
}

/// Row-major flatten
pub fn flatten(gray: &GrayImage) -> FeatureVector {
    gray.as_raw().iter().map(|&p| f64::from(p)).collect()
}

/// Decodes an image file into a `width * height` pixel vector
#[derive(Debug, Clone, Copy)]
pub struct ImageFeatureExtractor {
    width: u32,
    height: u32,
}

impl ImageFeatureExtractor {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of every vector this extractor produces
    pub fn dimension(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Grayscale, resize and flatten an already decoded image
    pub fn extract_image(&self, image: &DynamicImage) -> FeatureVector {
        flatten(&resize(&to_grayscale(image), self.width, self.height))
    }

    /// Decode from file contents; the format is sniffed, not taken from the
    /// extension
    pub fn decode(path: &Path) -> Result<DynamicImage, ExtractionError> {
        let bytes = std::fs::read(path)?;
        image::load_from_memory(&bytes).map_err(|e| ExtractionError::ImageDecode(e.to_string()))
    }
}

impl Default for ImageFeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl FeatureExtractor for ImageFeatureExtractor {
    type Output = FeatureVector;

    fn name(&self) -> &'static str {
        "image_pixels"
    }

    fn extract(&self, path: &Path) -> Result<FeatureVector, ExtractionError> {
        let image = Self::decode(path)?;
        Ok(self.extract_image(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_luma_weights_truncate() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(1, 0, Rgb([100, 0, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 0]));

        let gray = to_grayscale(&DynamicImage::ImageRgb8(rgb));
        // 255 * 0.9999 = 254.97
        assert_eq!(gray.get_pixel(0, 0).0, [254]);
        // 100 * 0.2989 = 29.89
        assert_eq!(gray.get_pixel(1, 0).0, [29]);
        assert_eq!(gray.get_pixel(2, 0).0, [0]);
    }

    #[test]
    fn test_alpha_is_dropped() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, Rgba([0, 200, 0, 0]));
        let gray = to_grayscale(&DynamicImage::ImageRgba8(rgba));
        // 200 * 0.587 = 117.4, fully transparent pixel still counts
        assert_eq!(gray.get_pixel(0, 0).0, [117]);
    }

    #[test]
    fn test_flatten_length_independent_of_source_size() {
        let extractor = ImageFeatureExtractor::new(30, 20);
        for (w, h) in [(1, 1), (640, 480), (17, 93), (30, 20)] {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])));
            assert_eq!(extractor.extract_image(&image).len(), 600);
        }
        assert_eq!(extractor.dimension(), 600);
    }

    #[test]
    fn test_flatten_is_row_major() {
        let mut gray = GrayImage::new(2, 2);
        gray.put_pixel(0, 0, Luma([1]));
        gray.put_pixel(1, 0, Luma([2]));
        gray.put_pixel(0, 1, Luma([3]));
        gray.put_pixel(1, 1, Luma([4]));
        assert_eq!(flatten(&gray), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = ImageFeatureExtractor::default().extract(&path).unwrap_err();
        assert_eq!(err.code(), "IMAGE_DECODE_ERROR");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ImageFeatureExtractor::default()
            .extract(Path::new("/nonexistent/cover.jpg"))
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
