//! End-to-end sheet grading pipeline.
//!
//! A [`Grader`] binds a template and configuration once and then grades any
//! number of photos: blur, fiducial detection, rectification, per-cell fill
//! scoring, classification, optional free-response OCR, and final tally. All
//! per-sheet failures are data ([`Status::FailedMarker`]), never panics, so a
//! batch always completes.

use image::imageops;
use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::classify::{classify_row, ItemResult};
use crate::config::{ConfigError, GraderConfig};
use crate::fiducial::detect_fiducials;
use crate::key::AnswerKey;
use crate::normalize;
use crate::ocr::{preprocess_region, OcrEngine};
use crate::rectify::rectify;
use crate::score::CellScorer;
use crate::sheet::{recompute, FreeResponseResult, SheetResult, Status};
use crate::template::{CanvasFrame, Template};

/// Construct-once grading engine for one template.
pub struct Grader {
    frame: CanvasFrame,
    config: GraderConfig,
}

impl Grader {
    /// A grader with default configuration.
    pub fn new(template: Template) -> Result<Self, ConfigError> {
        Self::with_config(template, GraderConfig::default())
    }

    /// A grader with explicit configuration. Validates thresholds and
    /// template geometry up front.
    pub fn with_config(template: Template, config: GraderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let frame = CanvasFrame::new(template, config.canvas_height)?;
        Ok(Self { frame, config })
    }

    /// The bound template.
    pub fn template(&self) -> &Template {
        self.frame.template()
    }

    /// Grade one photographed sheet.
    ///
    /// `source` labels the result (typically the filename). `ocr` handles the
    /// free-response column when the template has one; pass `None` to leave
    /// those rows empty for manual entry. OCR backend failures degrade to
    /// empty entries rather than failing the sheet.
    pub fn grade(
        &self,
        source: &str,
        photo: &GrayImage,
        key: &AnswerKey,
        ocr: Option<&dyn OcrEngine>,
    ) -> SheetResult {
        let blurred = imageproc::filter::gaussian_blur_f32(photo, self.config.blur_sigma);

        let markers = match detect_fiducials(&blurred, &self.config.fiducial) {
            Ok(set) => set,
            Err(e) => {
                warn!(source, candidates = e.candidates().len(), error = %e, "marker detection failed");
                return SheetResult::failed_marker(source, e.to_string());
            }
        };

        let canonical = match rectify(&blurred, &markers, &self.frame) {
            Ok(img) => img,
            Err(e) => {
                warn!(source, error = %e, "rectification failed");
                return SheetResult::failed_marker(source, e.to_string());
            }
        };

        let scorer = CellScorer::new(&canonical, self.config.score);
        let template = self.frame.template();
        let items: Vec<ItemResult> = (0..template.rows)
            .into_par_iter()
            .map(|row| {
                let scores: Vec<f32> = (0..template.choices)
                    .map(|choice| scorer.fill_score(self.frame.cell_rect(row, choice)))
                    .collect();
                classify_row(&scores, &self.config.thresholds)
            })
            .collect();

        let free = self.recognize_free_rows(&canonical, ocr);

        let sheet = SheetResult {
            source: source.to_string(),
            status: Status::NeedsReview,
            items,
            free,
            choice_tally: Default::default(),
            free_tally: Default::default(),
            failure: None,
        };
        let sheet = recompute(sheet, key);
        info!(
            source,
            status = %sheet.status,
            correct = sheet.choice_tally.correct + sheet.free_tally.correct,
            "sheet graded"
        );
        sheet
    }

    /// Grade a batch of photos, isolating per-sheet failures.
    pub fn grade_batch(
        &self,
        photos: &[(String, GrayImage)],
        key: &AnswerKey,
        ocr: Option<&dyn OcrEngine>,
    ) -> Vec<SheetResult> {
        photos
            .iter()
            .map(|(source, photo)| self.grade(source, photo, key, ocr))
            .collect()
    }

    fn recognize_free_rows(
        &self,
        canonical: &GrayImage,
        ocr: Option<&dyn OcrEngine>,
    ) -> Vec<FreeResponseResult> {
        let free_rows = self.frame.template().free_rows();
        if free_rows == 0 {
            return Vec::new();
        }
        let Some(engine) = ocr else {
            // No backend: rows exist but stay empty for manual entry.
            return vec![FreeResponseResult::empty(); free_rows];
        };

        (0..free_rows)
            .map(|row| {
                let Some(rect) = self.frame.free_rect(row) else {
                    return FreeResponseResult::empty();
                };
                let crop = imageops::crop_imm(
                    canonical,
                    rect.left() as u32,
                    rect.top() as u32,
                    rect.width(),
                    rect.height(),
                )
                .to_image();
                let prepared = preprocess_region(&crop, &self.config.ocr_prep);
                match engine.recognize(&prepared) {
                    Ok(outcome) => {
                        let corrected = normalize::repair_artifacts(&outcome.text);
                        let normalized = normalize::canonicalize(&corrected);
                        debug!(row, raw = %outcome.text, ?normalized, "free-response recognized");
                        FreeResponseResult {
                            raw: outcome.text,
                            corrected,
                            normalized,
                            confidence: outcome.confidence,
                            manual: false,
                        }
                    }
                    Err(e) => {
                        warn!(row, error = %e, "ocr backend failed; leaving row for manual entry");
                        FreeResponseResult::empty()
                    }
                }
            })
            .collect()
    }
}
