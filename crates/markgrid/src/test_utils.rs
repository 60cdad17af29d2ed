//! Synthetic sheet imagery shared by unit tests.

use image::{GrayImage, Luma};
use imageproc::rect::Rect;

use crate::template::{CanvasFrame, Template};

const PAPER: u8 = 230;
const INK: u8 = 25;
const MARKER_INTERIOR: u8 = 250;

/// Blank paper of the given size.
pub(crate) fn sheet_canvas(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([PAPER]))
}

fn put_clamped(img: &mut GrayImage, x: i64, y: i64, v: u8) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, Luma([v]));
    }
}

/// Draw a square ring marker centered at `(cx, cy)`: dark border, bright
/// interior at 50% linear size (the geometry the detector's concentric
/// contrast test assumes).
pub(crate) fn draw_ring_marker(img: &mut GrayImage, cx: f64, cy: f64, half: f64) {
    let outer = half.round() as i64;
    let inner = (half * 0.5).round() as i64;
    let cx = cx.round() as i64;
    let cy = cy.round() as i64;

    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let v = if dx.abs() <= inner && dy.abs() <= inner {
                MARKER_INTERIOR
            } else {
                INK
            };
            put_clamped(img, cx + dx, cy + dy, v);
        }
    }
}

/// Fill a rectangle with ink.
pub(crate) fn fill_cell(img: &mut GrayImage, rect: Rect) {
    for y in rect.top()..rect.top() + rect.height() as i32 {
        for x in rect.left()..rect.left() + rect.width() as i32 {
            put_clamped(img, x as i64, y as i64, INK);
        }
    }
}

/// Render a synthetic photo of a printed sheet: four corner ring markers at
/// the template's fiducial positions plus ink in the given `(row, choice)`
/// cells. The photo uses the template's own aspect ratio, so the rectifying
/// warp is a pure scale.
pub(crate) fn sheet_photo(template: &Template, height: u32, marks: &[(usize, usize)]) -> GrayImage {
    let frame = CanvasFrame::new(template.clone(), height)
        .unwrap_or_else(|e| panic!("invalid test template: {e}"));
    let mut img = sheet_canvas(frame.width(), frame.height());

    // Marker half-size of 4.5 mm matches the printed design closely enough
    // for the area and aspect filters.
    let marker_half = frame.y_px(4.5);
    for [x, y] in frame.fiducial_targets() {
        draw_ring_marker(&mut img, x, y, marker_half);
    }

    for &(row, choice) in marks {
        fill_cell(&mut img, frame.cell_rect(row, choice));
    }
    img
}
