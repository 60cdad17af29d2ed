//! OCR collaborator seam and region preprocessing.
//!
//! The engine never performs layout analysis: it hands the collaborator a
//! tightly cropped, binarized, upscaled region and consumes `{text,
//! confidence}` back. The trait keeps the actual OCR backend (and its charset
//! restriction) out of this crate.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use thiserror::Error;

use crate::score::IntegralImage;

/// Raw OCR output for one region.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OcrOutcome {
    /// Recognized text as returned by the backend.
    pub text: String,
    /// Backend confidence, if reported.
    pub confidence: Option<f32>,
}

/// OCR collaborator failure. Sheet processing records it and continues.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("ocr backend failure: {0}")]
    Backend(String),
}

/// Text recognition over a preprocessed grayscale region.
///
/// Implementations should restrict the charset to digits and the separators
/// `.` and `/`; the normalizer tolerates, but should not depend on, anything
/// wider.
pub trait OcrEngine {
    fn recognize(&self, region: &GrayImage) -> Result<OcrOutcome, OcrError>;
}

/// Region preprocessing tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OcrPrepConfig {
    /// Gaussian blur sigma applied before thresholding.
    pub blur_sigma: f32,
    /// Half-size of the local mean window for binarization.
    pub block_radius: u32,
    /// Binarization offset below the local mean.
    pub offset: f32,
    /// Integer upscale factor applied after binarization.
    pub upscale: u32,
}

impl Default for OcrPrepConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            block_radius: 10,
            offset: 8.0,
            upscale: 3,
        }
    }
}

/// Prepare a cropped free-response region for recognition: blur, local-mean
/// binarization with ink rendered white, then linear upscale.
pub fn preprocess_region(region: &GrayImage, config: &OcrPrepConfig) -> GrayImage {
    let blurred = imageproc::filter::gaussian_blur_f32(region, config.blur_sigma);
    let integral = IntegralImage::new(&blurred);

    let (w, h) = blurred.dimensions();
    let r = config.block_radius as usize;
    let mut binary = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mean = integral.local_mean(x as usize, y as usize, r);
            let p = blurred.get_pixel(x, y)[0] as f32;
            // Ink (below local mean by the offset) becomes white.
            let v = if p < mean - config.offset { 255 } else { 0 };
            binary.put_pixel(x, y, Luma([v]));
        }
    }

    let scale = config.upscale.max(1);
    imageops::resize(&binary, w * scale, h * scale, FilterType::Triangle)
}
