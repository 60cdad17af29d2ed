//! Engine configuration and validation.
//!
//! All tuning constants live here or in the per-stage config structs they
//! aggregate. Defaults are the empirical starting points from the original
//! field calibration; every value is external configuration, not a contract.

use thiserror::Error;

use crate::classify::Thresholds;
use crate::fiducial::FiducialConfig;
use crate::ocr::OcrPrepConfig;
use crate::score::ScoreConfig;
use crate::template::DEFAULT_CANVAS_HEIGHT;

/// Configuration rejected at construction time.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Classification thresholds violate `blank < review_low <= select`.
    #[error("inconsistent thresholds: blank {blank}, review_low {review_low}, select {select} (need blank < review_low <= select)")]
    InvalidThresholds {
        blank: f32,
        review_low: f32,
        select: f32,
    },
    /// Template geometry is internally inconsistent.
    #[error("invalid template {name:?}: {detail}")]
    InvalidTemplate { name: String, detail: String },
}

/// Full configuration for a [`Grader`](crate::Grader).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Canonical raster height in pixels; width follows the page aspect.
    pub canvas_height: u32,
    /// Gaussian blur sigma applied to the photo before fiducial detection.
    pub blur_sigma: f32,
    /// Fiducial detector tuning.
    pub fiducial: FiducialConfig,
    /// Cell fill-score tuning.
    pub score: ScoreConfig,
    /// Classification thresholds.
    pub thresholds: Thresholds,
    /// OCR region preprocessing tuning.
    pub ocr_prep: OcrPrepConfig,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            blur_sigma: 0.8,
            fiducial: FiducialConfig::default(),
            score: ScoreConfig::default(),
            thresholds: Thresholds::default(),
            ocr_prep: OcrPrepConfig::default(),
        }
    }
}

impl GraderConfig {
    /// Validate cross-field constraints. Called by `Grader` constructors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GraderConfig::default().validate().is_ok());
    }

    #[test]
    fn inconsistent_thresholds_are_refused() {
        let mut cfg = GraderConfig::default();
        cfg.thresholds.review_low = 0.1; // below blank
        assert!(cfg.validate().is_err());
    }
}
