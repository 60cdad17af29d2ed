//! Perspective rectification of a photo into the canonical raster.
//!
//! The transform maps the four detected marker centers onto their canonical
//! template positions; the canonical image is then resampled by inverse
//! mapping with bilinear interpolation. Out-of-bounds samples replicate the
//! nearest edge pixel.

use image::{GrayImage, Luma};
use thiserror::Error;

use crate::fiducial::FiducialSet;
use crate::homography::{perspective_from_corners, project, HomographyError};
use crate::template::CanvasFrame;

/// Rectification failure. Sheet-scoped, like marker detection failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RectifyError {
    #[error(transparent)]
    Homography(#[from] HomographyError),
    #[error("perspective transform is not invertible")]
    NotInvertible,
}

/// Bilinear sample with edge replication outside the image.
fn sample_clamped(gray: &GrayImage, x: f64, y: f64) -> f64 {
    let (w, h) = gray.dimensions();
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = gray.get_pixel(x0, y0)[0] as f64;
    let p10 = gray.get_pixel(x1, y0)[0] as f64;
    let p01 = gray.get_pixel(x0, y1)[0] as f64;
    let p11 = gray.get_pixel(x1, y1)[0] as f64;

    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Warp a photo into the canonical raster using the detected fiducials.
pub fn rectify(
    gray: &GrayImage,
    markers: &FiducialSet,
    frame: &CanvasFrame,
) -> Result<GrayImage, RectifyError> {
    let h = perspective_from_corners(&markers.centers(), &frame.fiducial_targets())?;
    let h_inv = h.try_inverse().ok_or(RectifyError::NotInvertible)?;

    let mut out = GrayImage::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let src = project(&h_inv, x as f64, y as f64);
            let v = sample_clamped(gray, src[0], src[1]);
            out.put_pixel(x, y, Luma([v.round().clamp(0.0, 255.0) as u8]));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiducial::FiducialCandidate;
    use crate::template::{CanvasFrame, Template};

    fn candidate(cx: f64, cy: f64) -> FiducialCandidate {
        FiducialCandidate {
            cx,
            cy,
            area: 100.0,
            inner_mean: 200.0,
            outer_mean: 60.0,
        }
    }

    /// Markers already at their canonical positions: the warp must be the
    /// identity and preserve pixel values away from the border.
    #[test]
    fn identity_markers_give_identity_warp() {
        let frame = CanvasFrame::new(Template::grid25(), 400).unwrap();
        let [tl, tr, bl, br] = frame.fiducial_targets();

        let mut img = GrayImage::from_pixel(frame.width(), frame.height(), Luma([200]));
        img.put_pixel(100, 150, Luma([30]));

        let markers = FiducialSet {
            top_left: candidate(tl[0], tl[1]),
            top_right: candidate(tr[0], tr[1]),
            bottom_left: candidate(bl[0], bl[1]),
            bottom_right: candidate(br[0], br[1]),
        };

        let warped = rectify(&img, &markers, &frame).unwrap();
        assert_eq!(warped.get_pixel(100, 150)[0], 30);
        assert_eq!(warped.get_pixel(50, 50)[0], 200);
    }

    #[test]
    fn warp_maps_marker_centers_to_targets() {
        let frame = CanvasFrame::new(Template::grid25(), 400).unwrap();
        // A mild synthetic perspective: shifted marker centers in the photo.
        let markers = FiducialSet {
            top_left: candidate(40.0, 35.0),
            top_right: candidate(250.0, 42.0),
            bottom_left: candidate(36.0, 350.0),
            bottom_right: candidate(255.0, 360.0),
        };

        let h = perspective_from_corners(&markers.centers(), &frame.fiducial_targets()).unwrap();
        for (src, dst) in markers.centers().iter().zip(frame.fiducial_targets()) {
            let p = project(&h, src[0], src[1]);
            assert!((p[0] - dst[0]).abs() < 1.0, "x off: {} vs {}", p[0], dst[0]);
            assert!((p[1] - dst[1]).abs() < 1.0, "y off: {} vs {}", p[1], dst[1]);
        }
    }

    #[test]
    fn out_of_bounds_samples_replicate_edges() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([100]));
        img.put_pixel(0, 0, Luma([10]));
        assert_eq!(sample_clamped(&img, -5.0, -5.0), 10.0);
        assert_eq!(sample_clamped(&img, 4.0, 4.0), 100.0);
    }
}
