//! Corner fiducial detection.
//!
//! The sheet corners carry square ring markers: a dark border around a bright
//! interior. Detection binarizes with an Otsu threshold, walks external
//! contours, and keeps square-ish candidates whose concentric inner region is
//! both bright in absolute terms and clearly brighter than the surrounding
//! ring. The contrast test is what makes the marker robust to lighting
//! gradients and paper curvature; a solid dark blob, text, or a shadow fails
//! it.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use thiserror::Error;
use tracing::debug;

/// Fiducial detector tuning.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FiducialConfig {
    /// Minimum candidate bounding area as a fraction of the image area.
    pub min_area_frac: f64,
    /// Minimum bounding-box aspect ratio (w/h).
    pub aspect_min: f64,
    /// Maximum bounding-box aspect ratio (w/h).
    pub aspect_max: f64,
    /// Absolute brightness floor for the inner region mean.
    pub inner_mean_min: f64,
    /// Minimum excess of the inner mean over the outer-ring mean.
    pub ring_contrast_min: f64,
    /// Largest-area candidates considered for corner assignment.
    pub max_corner_candidates: usize,
}

impl Default for FiducialConfig {
    fn default() -> Self {
        Self {
            min_area_frac: 0.00035,
            aspect_min: 0.80,
            aspect_max: 1.20,
            inner_mean_min: 125.0,
            ring_contrast_min: 28.0,
            max_corner_candidates: 8,
        }
    }
}

/// A detected ring-marker candidate in photo pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiducialCandidate {
    /// Center x (photo px).
    pub cx: f64,
    /// Center y (photo px).
    pub cy: f64,
    /// Bounding-box area (px²).
    pub area: f64,
    /// Mean intensity of the concentric inner region.
    pub inner_mean: f64,
    /// Mean intensity of the surrounding ring (bounding box minus inner).
    pub outer_mean: f64,
}

/// The four corner fiducials with resolved roles.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiducialSet {
    pub top_left: FiducialCandidate,
    pub top_right: FiducialCandidate,
    pub bottom_left: FiducialCandidate,
    pub bottom_right: FiducialCandidate,
}

impl FiducialSet {
    /// Marker centers ordered top-left, top-right, bottom-left, bottom-right
    /// (the order expected by the rectifier).
    pub fn centers(&self) -> [[f64; 2]; 4] {
        [
            [self.top_left.cx, self.top_left.cy],
            [self.top_right.cx, self.top_right.cy],
            [self.bottom_left.cx, self.bottom_left.cy],
            [self.bottom_right.cx, self.bottom_right.cy],
        ]
    }
}

/// Marker detection failure. Fatal for the sheet; carries the surviving
/// candidates for diagnostics.
#[derive(Debug, Clone, Error)]
pub enum FiducialError {
    #[error("insufficient ring candidates: found {found}, need 4")]
    InsufficientCandidates {
        found: usize,
        candidates: Vec<FiducialCandidate>,
    },
    #[error("ambiguous corner assignment: two roles resolve to the same candidate")]
    AmbiguousCorners { candidates: Vec<FiducialCandidate> },
}

impl FiducialError {
    /// Surviving candidates at the point of failure.
    pub fn candidates(&self) -> &[FiducialCandidate] {
        match self {
            FiducialError::InsufficientCandidates { candidates, .. } => candidates,
            FiducialError::AmbiguousCorners { candidates } => candidates,
        }
    }
}

/// Mean intensity over an axis-aligned region. Bounds must be valid.
fn region_mean(gray: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> f64 {
    let mut sum = 0u64;
    for yy in y..y + h {
        for xx in x..x + w {
            sum += gray.get_pixel(xx, yy)[0] as u64;
        }
    }
    sum as f64 / (w as u64 * h as u64) as f64
}

/// Detect the four corner ring markers in a grayscale photo.
///
/// Returns the set with resolved corner roles, or a typed failure when fewer
/// than four plausible markers survive filtering or the extremal corner
/// assignment collapses onto a duplicate candidate.
pub fn detect_fiducials(
    gray: &GrayImage,
    config: &FiducialConfig,
) -> Result<FiducialSet, FiducialError> {
    let (img_w, img_h) = gray.dimensions();
    let img_area = img_w as f64 * img_h as f64;
    let min_area = img_area * config.min_area_frac;

    // Ink and marker borders become foreground.
    let level = otsu_level(gray);
    let binary = threshold(gray, level, ThresholdType::BinaryInverted);

    let mut candidates = Vec::new();
    for contour in find_contours::<u32>(&binary) {
        if contour.border_type != BorderType::Outer || contour.points.is_empty() {
            continue;
        }

        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let w = max_x - min_x + 1;
        let h = max_y - min_y + 1;
        let area = w as f64 * h as f64;
        if area < min_area {
            continue;
        }
        let aspect = w as f64 / h as f64;
        if aspect < config.aspect_min || aspect > config.aspect_max {
            continue;
        }

        // Concentric inner region: 50% linear size, centered.
        let ix = min_x + (w as f64 * 0.25).round() as u32;
        let iy = min_y + (h as f64 * 0.25).round() as u32;
        let iw = (w as f64 * 0.5).round() as u32;
        let ih = (h as f64 * 0.5).round() as u32;
        if iw == 0 || ih == 0 || ix + iw >= img_w || iy + ih >= img_h {
            continue;
        }

        let rect_mean = region_mean(gray, min_x, min_y, w, h);
        let inner_mean = region_mean(gray, ix, iy, iw, ih);
        let inner_area = iw as f64 * ih as f64;
        let ring_area = (area - inner_area).max(1.0);
        let outer_mean = (rect_mean * area - inner_mean * inner_area) / ring_area;

        if inner_mean < config.inner_mean_min
            || (inner_mean - outer_mean) < config.ring_contrast_min
        {
            continue;
        }

        candidates.push(FiducialCandidate {
            cx: min_x as f64 + w as f64 / 2.0,
            cy: min_y as f64 + h as f64 / 2.0,
            area,
            inner_mean,
            outer_mean,
        });
    }

    debug!(found = candidates.len(), "ring candidates after filtering");

    if candidates.len() < 4 {
        return Err(FiducialError::InsufficientCandidates {
            found: candidates.len(),
            candidates,
        });
    }

    // Largest markers first; cap to bound role-assignment cost.
    candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
    candidates.truncate(config.max_corner_candidates);

    // Corner roles by extremal combinations of (cx, cy).
    let extremal = |better: fn(&FiducialCandidate, &FiducialCandidate) -> bool| -> usize {
        let mut best = 0;
        for i in 1..candidates.len() {
            if better(&candidates[i], &candidates[best]) {
                best = i;
            }
        }
        best
    };
    let tl = extremal(|a, b| a.cx + a.cy < b.cx + b.cy);
    let br = extremal(|a, b| a.cx + a.cy > b.cx + b.cy);
    let tr = extremal(|a, b| a.cx - a.cy > b.cx - b.cy);
    let bl = extremal(|a, b| a.cx - a.cy < b.cx - b.cy);

    let roles = [tl, tr, bl, br];
    for i in 0..4 {
        for j in (i + 1)..4 {
            if roles[i] == roles[j] {
                return Err(FiducialError::AmbiguousCorners { candidates });
            }
        }
    }

    Ok(FiducialSet {
        top_left: candidates[tl],
        top_right: candidates[tr],
        bottom_left: candidates[bl],
        bottom_right: candidates[br],
    })
}
