//! Per-cell fill scoring on the rectified raster.
//!
//! A cell's fill score is the fraction of its pixels that are locally dark: a
//! pixel counts as ink when it falls below the mean of its surrounding block
//! by more than a fixed offset. The local (rather than global) reference is
//! what keeps pencil marks detectable under uneven lighting.

use image::GrayImage;
use imageproc::rect::Rect;

/// Fill-score tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Half-size of the local mean window (full block is `2r+1` square).
    pub block_radius: u32,
    /// A pixel must be darker than the local mean by this much to count.
    pub offset: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            block_radius: 10,
            offset: 7.0,
        }
    }
}

/// Summed-area table over a grayscale image.
///
/// `sums` has one extra row and column so that rectangle sums need no bounds
/// special-casing.
pub(crate) struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn new(gray: &GrayImage) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0u64;
            for x in 0..width {
                row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
                sums[(y + 1) * stride + (x + 1)] = row_sum + sums[y * stride + (x + 1)];
            }
        }
        Self {
            width,
            height,
            sums,
        }
    }

    /// Sum over `[x0, x1) × [y0, y1)`. Bounds must satisfy
    /// `x0 <= x1 <= width`, `y0 <= y1 <= height`.
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let stride = self.width + 1;
        self.sums[y1 * stride + x1] + self.sums[y0 * stride + x0]
            - self.sums[y0 * stride + x1]
            - self.sums[y1 * stride + x0]
    }

    /// Mean over the block of radius `r` centered at `(cx, cy)`, clamped to
    /// the image.
    pub(crate) fn local_mean(&self, cx: usize, cy: usize, r: usize) -> f32 {
        let x0 = cx.saturating_sub(r);
        let y0 = cy.saturating_sub(r);
        let x1 = (cx + r + 1).min(self.width);
        let y1 = (cy + r + 1).min(self.height);
        let n = ((x1 - x0) * (y1 - y0)) as f32;
        self.sum(x0, y0, x1, y1) as f32 / n
    }
}

/// Fill scorer for one rectified image.
///
/// Construct once per sheet; scoring is read-only and safe to run per-row in
/// parallel.
pub struct CellScorer<'a> {
    gray: &'a GrayImage,
    integral: IntegralImage,
    config: ScoreConfig,
}

impl<'a> CellScorer<'a> {
    pub fn new(gray: &'a GrayImage, config: ScoreConfig) -> Self {
        Self {
            gray,
            integral: IntegralImage::new(gray),
            config,
        }
    }

    /// Estimated ink-fill ratio of the cell region, in `[0, 1]`.
    pub fn fill_score(&self, cell: Rect) -> f32 {
        let r = self.config.block_radius as usize;
        let x0 = cell.left().max(0) as usize;
        let y0 = cell.top().max(0) as usize;
        let x1 = x0 + cell.width() as usize;
        let y1 = y0 + cell.height() as usize;

        let mut ink = 0usize;
        let mut total = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let mean = self.integral.local_mean(x, y, r);
                let p = self.gray.get_pixel(x as u32, y as u32)[0] as f32;
                if p < mean - self.config.offset {
                    ink += 1;
                }
                total += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            ink as f32 / total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn integral_sums_match_naive() {
        let mut img = GrayImage::new(7, 5);
        for (i, p) in img.pixels_mut().enumerate() {
            *p = Luma([(i % 256) as u8]);
        }
        let integral = IntegralImage::new(&img);
        let mut naive = 0u64;
        for y in 1..4 {
            for x in 2..6 {
                naive += img.get_pixel(x, y)[0] as u64;
            }
        }
        assert_eq!(integral.sum(2, 1, 6, 4), naive);
    }

    #[test]
    fn uniform_region_scores_zero() {
        let img = uniform(100, 100, 220);
        let scorer = CellScorer::new(&img, ScoreConfig::default());
        let s = scorer.fill_score(Rect::at(30, 30).of_size(20, 20));
        assert_eq!(s, 0.0);
    }

    #[test]
    fn fully_inked_cell_scores_high() {
        let mut img = uniform(200, 200, 220);
        // Dark 20x20 blob in the middle of white paper.
        for y in 90..110 {
            for x in 90..110 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let scorer = CellScorer::new(&img, ScoreConfig::default());
        let filled = scorer.fill_score(Rect::at(90, 90).of_size(20, 20));
        let empty = scorer.fill_score(Rect::at(10, 10).of_size(20, 20));
        assert!(filled > 0.5, "filled cell scored {filled}");
        assert_eq!(empty, 0.0);
    }

    #[test]
    fn partial_fill_scores_between() {
        let mut img = uniform(200, 200, 220);
        // Ink covers the left half of the cell.
        for y in 90..110 {
            for x in 90..100 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let scorer = CellScorer::new(&img, ScoreConfig::default());
        let s = scorer.fill_score(Rect::at(90, 90).of_size(20, 20));
        assert!(s > 0.3 && s < 0.7, "half-filled cell scored {s}");
    }
}
