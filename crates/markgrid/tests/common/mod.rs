//! Synthetic sheet photos built through the public template geometry.

use image::{GrayImage, Luma};
use markgrid::{CanvasFrame, Template};

pub const PAPER: u8 = 230;
pub const INK: u8 = 25;

fn put_clamped(img: &mut GrayImage, x: i64, y: i64, v: u8) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, Luma([v]));
    }
}

/// Square ring marker: dark border, bright interior at half the linear size.
pub fn draw_ring_marker(img: &mut GrayImage, cx: f64, cy: f64, half: f64) {
    let outer = half.round() as i64;
    let inner = (half * 0.5).round() as i64;
    let cx = cx.round() as i64;
    let cy = cy.round() as i64;
    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let v = if dx.abs() <= inner && dy.abs() <= inner { 250 } else { INK };
            put_clamped(img, cx + dx, cy + dy, v);
        }
    }
}

/// Render a photo of a sheet with the given `(row, choice)` cells filled in.
pub fn sheet_photo(template: &Template, height: u32, marks: &[(usize, usize)]) -> GrayImage {
    let frame = CanvasFrame::new(template.clone(), height).expect("valid template");
    let mut img = GrayImage::from_pixel(frame.width(), frame.height(), Luma([PAPER]));

    let marker_half = frame.y_px(4.5);
    for [x, y] in frame.fiducial_targets() {
        draw_ring_marker(&mut img, x, y, marker_half);
    }

    for &(row, choice) in marks {
        let rect = frame.cell_rect(row, choice);
        for y in rect.top()..rect.top() + rect.height() as i32 {
            for x in rect.left()..rect.left() + rect.width() as i32 {
                put_clamped(&mut img, x as i64, y as i64, INK);
            }
        }
    }
    img
}
