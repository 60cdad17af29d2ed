//! Sheet template geometry: physical millimeter layout and its mapping to
//! canonical raster pixels.
//!
//! A [`Template`] describes one printed answer-sheet design entirely in page
//! millimeters, independent of any photo resolution. A [`CanvasFrame`] binds a
//! template to a fixed canonical raster size and performs all mm→px
//! conversion, so resizing the source photo never touches scoring logic.

use imageproc::rect::Rect;

use crate::config::ConfigError;

/// A4 page width in millimeters.
pub const PAGE_W_MM: f64 = 210.0;
/// A4 page height in millimeters.
pub const PAGE_H_MM: f64 = 297.0;
/// Default canonical raster height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1800;

const MARKER_CENTER_OFFSET_MM: f64 = 17.0;
const CHOICE_X_MM: [f64; 5] = [50.0, 57.0, 64.0, 71.0, 78.0];
const CELL_HALF_MM: f64 = 4.0;

/// Free-response row geometry for templates with a short-answer column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FreeResponseLayout {
    /// Number of free-response rows.
    pub rows: usize,
    /// Height of one row (mm).
    pub row_h_mm: f64,
    /// Distance from the page top to the top edge of the first row (mm).
    pub top_mm: f64,
    /// Left edge of the answer box column (mm).
    pub x0_mm: f64,
    /// Right edge of the answer box column (mm).
    pub x1_mm: f64,
    /// Padding inset applied on every side of the answer box (mm).
    pub pad_mm: f64,
}

/// Immutable description of one printed answer-sheet design.
///
/// All geometry is expressed in page millimeters relative to the page origin
/// (top-left). Distinct sheet designs are distinct `Template` *values*; the
/// scoring engine itself is layout-agnostic.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    /// Human-readable template name.
    pub name: String,
    /// Page width (mm).
    pub page_w_mm: f64,
    /// Page height (mm).
    pub page_h_mm: f64,
    /// Distance from each page edge to the fiducial marker center (mm).
    pub marker_center_offset_mm: f64,
    /// Number of scored multiple-choice rows.
    pub rows: usize,
    /// Number of choices per row.
    pub choices: usize,
    /// Choice-center x offsets from the page left edge (mm), one per choice.
    pub choice_x_mm: Vec<f64>,
    /// Row-center y of the first scored row (mm from page top).
    pub row_y0_mm: f64,
    /// Vertical gap between consecutive row centers (mm).
    pub row_gap_mm: f64,
    /// Half-size of the square answer-cell sampling region (mm).
    pub cell_half_mm: f64,
    /// Free-response column geometry, if the design has one.
    pub free_response: Option<FreeResponseLayout>,
}

impl Template {
    /// The 25-row multiple-choice grid design.
    ///
    /// Bubble centers sit at `y = 46 + 8·i` mm from the page top.
    pub fn grid25() -> Self {
        Self {
            name: "grid25".to_string(),
            page_w_mm: PAGE_W_MM,
            page_h_mm: PAGE_H_MM,
            marker_center_offset_mm: MARKER_CENTER_OFFSET_MM,
            rows: 25,
            choices: CHOICE_X_MM.len(),
            choice_x_mm: CHOICE_X_MM.to_vec(),
            row_y0_mm: 46.0,
            row_gap_mm: 8.0,
            cell_half_mm: CELL_HALF_MM,
            free_response: None,
        }
    }

    /// The mixed design: 30 multiple-choice rows plus a 10-row free-response
    /// column on the right.
    ///
    /// The layout is derived from the printable band between 68 mm from the
    /// page top and 64 mm from the page bottom, split into 31 equal gaps for
    /// the multiple-choice rows and 10 equal rows for the answer table.
    pub fn mixed30() -> Self {
        let page_margin_mm = 14.0;
        let usable_w_mm = PAGE_W_MM - 2.0 * page_margin_mm;
        let split_x_mm = page_margin_mm + usable_w_mm * 0.58;
        let table_x0_mm = split_x_mm + 4.0;
        let table_x1_mm = PAGE_W_MM - page_margin_mm;
        let num_col_w_mm = 14.0;

        let band_top_mm = 68.0;
        let band_bottom_mm = PAGE_H_MM - 64.0;
        let band_h_mm = band_bottom_mm - band_top_mm;

        let rows = 30;
        let free_rows = 10;
        let row_gap_mm = band_h_mm / (rows as f64 + 1.0);

        Self {
            name: "mixed30".to_string(),
            page_w_mm: PAGE_W_MM,
            page_h_mm: PAGE_H_MM,
            marker_center_offset_mm: MARKER_CENTER_OFFSET_MM,
            rows,
            choices: CHOICE_X_MM.len(),
            choice_x_mm: CHOICE_X_MM.to_vec(),
            row_y0_mm: band_top_mm + row_gap_mm,
            row_gap_mm,
            cell_half_mm: CELL_HALF_MM,
            free_response: Some(FreeResponseLayout {
                rows: free_rows,
                row_h_mm: band_h_mm / free_rows as f64,
                top_mm: band_top_mm,
                x0_mm: table_x0_mm + num_col_w_mm,
                x1_mm: table_x1_mm,
                pad_mm: 2.5,
            }),
        }
    }

    /// Row-center y coordinate for a 0-based scored row (mm from page top).
    pub fn row_center_y_mm(&self, row: usize) -> f64 {
        self.row_y0_mm + self.row_gap_mm * row as f64
    }

    /// Number of free-response rows (0 when the design has none).
    pub fn free_rows(&self) -> usize {
        self.free_response.as_ref().map_or(0, |fr| fr.rows)
    }

    /// Check internal consistency of the template geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.choices == 0 || self.choice_x_mm.len() != self.choices {
            return Err(ConfigError::InvalidTemplate {
                name: self.name.clone(),
                detail: format!(
                    "choice_x_mm has {} entries for {} choices",
                    self.choice_x_mm.len(),
                    self.choices
                ),
            });
        }
        if self.rows == 0 {
            return Err(ConfigError::InvalidTemplate {
                name: self.name.clone(),
                detail: "template has no scored rows".to_string(),
            });
        }
        if self.page_w_mm <= 0.0 || self.page_h_mm <= 0.0 {
            return Err(ConfigError::InvalidTemplate {
                name: self.name.clone(),
                detail: "non-positive page dimensions".to_string(),
            });
        }
        Ok(())
    }
}

/// A [`Template`] bound to a fixed canonical raster size.
///
/// The raster height is configurable; the width follows from the page aspect
/// ratio. Millimeter coordinates map to pixels through independent linear
/// scale factors per axis.
#[derive(Debug, Clone)]
pub struct CanvasFrame {
    template: Template,
    width: u32,
    height: u32,
}

impl CanvasFrame {
    /// Bind a template to a canonical raster of the given height.
    pub fn new(template: Template, height: u32) -> Result<Self, ConfigError> {
        template.validate()?;
        if height == 0 {
            return Err(ConfigError::InvalidTemplate {
                name: template.name.clone(),
                detail: "canvas height must be positive".to_string(),
            });
        }
        let width = (height as f64 * template.page_w_mm / template.page_h_mm).round() as u32;
        Ok(Self {
            template,
            width,
            height,
        })
    }

    /// Canonical raster width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canonical raster height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The bound template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Convert a horizontal page coordinate (mm) to canonical pixels.
    pub fn x_px(&self, mm: f64) -> f64 {
        mm * self.width as f64 / self.template.page_w_mm
    }

    /// Convert a vertical page coordinate (mm) to canonical pixels.
    pub fn y_px(&self, mm: f64) -> f64 {
        mm * self.height as f64 / self.template.page_h_mm
    }

    /// Canonical positions of the four fiducial marker centers, ordered
    /// top-left, top-right, bottom-left, bottom-right.
    pub fn fiducial_targets(&self) -> [[f64; 2]; 4] {
        let t = &self.template;
        let near_x = self.x_px(t.marker_center_offset_mm);
        let far_x = self.x_px(t.page_w_mm - t.marker_center_offset_mm);
        let near_y = self.y_px(t.marker_center_offset_mm);
        let far_y = self.y_px(t.page_h_mm - t.marker_center_offset_mm);
        [
            [near_x, near_y],
            [far_x, near_y],
            [near_x, far_y],
            [far_x, far_y],
        ]
    }

    /// Center of one answer cell in canonical pixels.
    pub fn cell_center(&self, row: usize, choice: usize) -> (f64, f64) {
        let t = &self.template;
        (
            self.x_px(t.choice_x_mm[choice]),
            self.y_px(t.row_center_y_mm(row)),
        )
    }

    /// Bounding rectangle of one answer cell, clamped to the raster.
    ///
    /// Always at least 1×1 px.
    pub fn cell_rect(&self, row: usize, choice: usize) -> Rect {
        let (cx, cy) = self.cell_center(row, choice);
        let half_w = self.x_px(self.template.cell_half_mm);
        let half_h = self.y_px(self.template.cell_half_mm);
        self.clamped_rect(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    /// Bounding rectangle of one free-response answer box, clamped to the
    /// raster. `None` when the template has no free-response column.
    pub fn free_rect(&self, row: usize) -> Option<Rect> {
        let fr = self.template.free_response.as_ref()?;
        let y_top = fr.top_mm + fr.row_h_mm * row as f64;
        let x0 = self.x_px(fr.x0_mm + fr.pad_mm);
        let x1 = self.x_px(fr.x1_mm - fr.pad_mm);
        let y0 = self.y_px(y_top + fr.pad_mm);
        let y1 = self.y_px(y_top + fr.row_h_mm - fr.pad_mm);
        Some(self.clamped_rect(x0, y0, x1, y1))
    }

    fn clamped_rect(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        let max_x = (self.width - 1) as i64;
        let max_y = (self.height - 1) as i64;
        let x0 = (x0.round() as i64).clamp(0, max_x);
        let y0 = (y0.round() as i64).clamp(0, max_y);
        let x1 = (x1.round() as i64).clamp(0, max_x);
        let y1 = (y1.round() as i64).clamp(0, max_y);
        let w = (x1 - x0).max(1) as u32;
        let h = (y1 - y0).max(1) as u32;
        Rect::at(x0 as i32, y0 as i32).of_size(w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid25_row_centers_follow_print_spec() {
        let t = Template::grid25();
        assert_relative_eq!(t.row_center_y_mm(0), 46.0);
        assert_relative_eq!(t.row_center_y_mm(24), 46.0 + 8.0 * 24.0);
    }

    #[test]
    fn mixed30_band_geometry() {
        let t = Template::mixed30();
        assert_eq!(t.rows, 30);
        assert_relative_eq!(t.row_gap_mm, 165.0 / 31.0, epsilon = 1e-9);
        let fr = t.free_response.as_ref().unwrap();
        assert_eq!(fr.rows, 10);
        assert_relative_eq!(fr.row_h_mm, 16.5, epsilon = 1e-9);
        assert_relative_eq!(fr.x0_mm, 137.56, epsilon = 1e-9);
        assert_relative_eq!(fr.x1_mm, 196.0, epsilon = 1e-9);
    }

    #[test]
    fn canvas_width_follows_aspect_ratio() {
        let frame = CanvasFrame::new(Template::grid25(), 1800).unwrap();
        assert_eq!(frame.height(), 1800);
        assert_eq!(frame.width(), 1273);
    }

    #[test]
    fn mm_to_px_is_linear_per_axis() {
        let frame = CanvasFrame::new(Template::grid25(), 1800).unwrap();
        assert_relative_eq!(frame.y_px(297.0), 1800.0);
        assert_relative_eq!(frame.x_px(105.0), 1273.0 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn cell_rect_is_clamped_and_nonempty() {
        let frame = CanvasFrame::new(Template::grid25(), 200).unwrap();
        for row in 0..25 {
            for choice in 0..5 {
                let r = frame.cell_rect(row, choice);
                assert!(r.width() >= 1 && r.height() >= 1);
                assert!(r.left() >= 0 && r.top() >= 0);
                assert!((r.left() + r.width() as i32) <= frame.width() as i32);
                assert!((r.top() + r.height() as i32) <= frame.height() as i32);
            }
        }
    }

    #[test]
    fn fiducial_targets_are_symmetric() {
        let frame = CanvasFrame::new(Template::grid25(), 1800).unwrap();
        let [tl, tr, bl, br] = frame.fiducial_targets();
        assert_relative_eq!(tl[0], frame.x_px(17.0));
        assert_relative_eq!(tr[0], frame.x_px(210.0 - 17.0));
        assert_relative_eq!(bl[1], br[1]);
        assert_relative_eq!(tl[1], tr[1]);
    }

    #[test]
    fn invalid_template_is_rejected() {
        let mut t = Template::grid25();
        t.choice_x_mm.pop();
        assert!(t.validate().is_err());
        assert!(CanvasFrame::new(t, 1800).is_err());
    }
}
