//! markgrid — optical mark recognition for photographed answer sheets.
//!
//! The engine grades smartphone photos of filled-in answer sheets against a
//! known printed template. The pipeline stages are:
//!
//! 1. **Fiducials** – corner ring markers via Otsu binarization, contour
//!    filtering, and a concentric contrast test ([`fiducial`]).
//! 2. **Rectify** – a 4-point homography maps the photo onto a canonical
//!    raster with fixed template geometry ([`rectify`]).
//! 3. **Score** – per-cell ink ratio against a local adaptive threshold
//!    ([`score`]).
//! 4. **Classify** – fill-score vectors become per-row verdicts with
//!    explicit uncertainty flags ([`classify`]).
//! 5. **Free response** – cropped answer boxes are binarized and handed to a
//!    pluggable OCR backend; output is normalized to canonical numeric
//!    strings ([`ocr`], [`normalize`]).
//! 6. **Tally and review** – results are plain values; operator overrides
//!    re-derive status and score from scratch ([`sheet`], [`review`]).
//!
//! [`Grader`] binds a [`Template`] and configuration once and grades any
//! number of photos. Per-sheet failures (missing markers, degenerate
//! geometry) are reported as data, never panics, so batch runs always
//! complete.
//!
//! ```no_run
//! use markgrid::{AnswerKey, Grader, Template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grader = Grader::new(Template::grid25())?;
//! let key = AnswerKey::empty(25, 0);
//! let photo = image::open("sheet.jpg")?.to_luma8();
//! let result = grader.grade("sheet.jpg", &photo, &key, None);
//! println!("{}: {} correct", result.status, result.choice_tally.correct);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod fiducial;
pub mod grader;
pub mod homography;
pub mod key;
pub mod normalize;
pub mod ocr;
pub mod rectify;
pub mod review;
pub mod score;
pub mod sheet;
pub mod template;

#[cfg(test)]
mod test_utils;

pub use classify::{ItemFlag, ItemResult, Thresholds};
pub use config::{ConfigError, GraderConfig};
pub use fiducial::{FiducialCandidate, FiducialConfig, FiducialError, FiducialSet};
pub use grader::Grader;
pub use key::{AnswerKey, KeyError};
pub use ocr::{OcrEngine, OcrError, OcrOutcome, OcrPrepConfig};
pub use review::{override_choice, override_free_response, ReviewError};
pub use sheet::{
    recompute, summarize, BatchSummary, FreeResponseResult, SheetResult, Status, Tally,
};
pub use template::{CanvasFrame, FreeResponseLayout, Template};
