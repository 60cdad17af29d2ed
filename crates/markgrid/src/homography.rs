//! Exact 4-point perspective transform.
//!
//! Four correspondences determine the homography exactly, so the solve is a
//! direct 8×8 linear system (unknowns h11..h32, h33 fixed to 1) rather than
//! an overdetermined DLT. There is no residual to check; correctness rests on
//! the fiducial detector.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use thiserror::Error;

/// Homography construction failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    /// The four correspondences are degenerate (e.g. three collinear points).
    #[error("degenerate point configuration: perspective system is singular")]
    Degenerate,
}

/// Project a 2D point through a 3×3 homography: `H · [x, y, 1]ᵀ → [u, v]`.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Solve the perspective transform mapping `src[i] → dst[i]` for four point
/// correspondences.
pub fn perspective_from_corners(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, HomographyError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];

        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -x * u;
        a[(r, 7)] = -y * u;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -x * v;
        a[(r + 1, 7)] = -y * v;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b).ok_or(HomographyError::Degenerate)?;

    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}
