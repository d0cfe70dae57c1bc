//! Image preprocessing for OCR: luma grayscale and global binarization.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tracing::trace;

use crate::error::OcrError;

/// Luma statistics of one page, discarded once its image is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumaStats {
    pub avg_luma: f32,
    pub threshold: f32,
}

/// Image preprocessor for the OCR pipeline.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Fraction of the average luma used as threshold.
    luma_factor: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self { luma_factor: 0.9 }
    }

    /// Set the threshold factor.
    pub fn with_luma_factor(mut self, factor: f32) -> Self {
        self.luma_factor = factor;
        self
    }

    /// Binarize a page raster.
    ///
    /// First pass writes `0.299R + 0.587G + 0.114B` into the colour channels
    /// and sums it; second pass turns every pixel darker than
    /// `average * luma_factor` black and everything else white. Alpha is kept.
    pub fn binarize(&self, image: &RgbaImage) -> Result<(RgbaImage, LumaStats), OcrError> {
        let (width, height) = image.dimensions();
        let pixel_count = u64::from(width) * u64::from(height);
        if pixel_count == 0 {
            return Err(OcrError::InvalidImage(format!("empty raster {width}x{height}")));
        }
        if !(self.luma_factor.is_finite() && self.luma_factor > 0.0) {
            return Err(OcrError::Preprocessing(format!(
                "invalid luma factor {}",
                self.luma_factor
            )));
        }

        let mut out = image.clone();

        let mut sum = 0f64;
        for pixel in out.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let luma = (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b))
                .round()
                .min(255.0) as u8;
            pixel.0[0] = luma;
            pixel.0[1] = luma;
            pixel.0[2] = luma;
            sum += f64::from(luma);
        }

        let avg_luma = (sum / pixel_count as f64) as f32;
        let threshold = avg_luma * self.luma_factor;

        for pixel in out.pixels_mut() {
            let value = if f32::from(pixel.0[0]) < threshold { 0 } else { 255 };
            pixel.0[0] = value;
            pixel.0[1] = value;
            pixel.0[2] = value;
        }

        trace!(
            "Binarized {}x{}: avg luma {:.1}, threshold {:.1}",
            width, height, avg_luma, threshold
        );

        Ok((out, LumaStats { avg_luma, threshold }))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a raster to PNG for the recognition worker.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    fn is_pure(p: &Rgba<u8>) -> bool {
        matches!(p.0, [0, 0, 0, _] | [255, 255, 255, _])
    }

    #[test]
    fn uniform_gray_becomes_white() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        let (out, stats) = ImagePreprocessor::new().binarize(&image).unwrap();

        assert_eq!(stats.avg_luma, 128.0);
        assert!(stats.threshold < stats.avg_luma);
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn dark_text_on_light_background_splits() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([240, 235, 220, 255]));
        for x in 2..8 {
            image.put_pixel(x, 5, Rgba([30, 30, 40, 255]));
        }

        let (out, _) = ImagePreprocessor::new().binarize(&image).unwrap();

        assert!(out.pixels().all(is_pure));
        assert_eq!(out.get_pixel(3, 5).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let black = out.pixels().filter(|p| p.0[0] == 0).count();
        assert_eq!(black, 6);
    }

    #[test]
    fn luma_uses_standard_weights() {
        // Pure green is brighter than pure red, which is brighter than blue.
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        image.put_pixel(2, 0, Rgba([0, 0, 255, 255]));

        let (out, stats) = ImagePreprocessor::new().binarize(&image).unwrap();

        // (76 + 150 + 29) / 3 = 85
        assert_eq!(stats.avg_luma, 85.0);
        let row: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(row, vec![0, 255, 0]);
    }

    #[test]
    fn alpha_is_preserved() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 7]));
        let (out, _) = ImagePreprocessor::new().binarize(&image).unwrap();
        assert!(out.pixels().all(|p| p.0[3] == 7));
    }

    #[test]
    fn empty_raster_is_rejected() {
        let image = RgbaImage::new(0, 0);
        assert!(ImagePreprocessor::new().binarize(&image).is_err());
    }

    #[test]
    fn png_round_trips_dimensions() {
        let image = RgbaImage::from_pixel(5, 3, Rgba([255, 255, 255, 255]));
        let png = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }
}
