//! Plate box overlay drawn over the live view.

use crate::recognition::BoundingBox;
use image::{Rgb, RgbImage};

/// Stroke colour of the overlay rectangle.
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([0x00, 0xFF, 0x00]);

/// Stroke width of the overlay rectangle in pixels.
pub const OVERLAY_STROKE: u32 = 4;

/// Height of the label tab drawn above the rectangle.
const LABEL_TAB_HEIGHT: u32 = 24;

/// Where the last recognition located a plate.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub bbox: BoundingBox,
    pub label: String,
}

impl Overlay {
    pub fn new(bbox: BoundingBox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            label: label.into(),
        }
    }

    /// Draws the rectangle, plus a filled tab where the label goes, onto
    /// `image`. Text itself is left to the UI layer.
    pub fn render(&self, image: &mut RgbImage) {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let (x1, y1, x2, y2) = self.bbox.to_pixels();
        let clamp_x = |v: i64| v.clamp(0, i64::from(w) - 1) as u32;
        let clamp_y = |v: i64| v.clamp(0, i64::from(h) - 1) as u32;
        let (left, right) = (clamp_x(x1), clamp_x(x2));
        let (top, bottom) = (clamp_y(y1), clamp_y(y2));

        for t in 0..OVERLAY_STROKE {
            let top_row = (top + t).min(bottom);
            let bottom_row = bottom.saturating_sub(t).max(top);
            let left_col = (left + t).min(right);
            let right_col = right.saturating_sub(t).max(left);
            for x in left..=right {
                image.put_pixel(x, top_row, OVERLAY_COLOR);
                image.put_pixel(x, bottom_row, OVERLAY_COLOR);
            }
            for y in top..=bottom {
                image.put_pixel(left_col, y, OVERLAY_COLOR);
                image.put_pixel(right_col, y, OVERLAY_COLOR);
            }
        }

        let tab_top = top.saturating_sub(LABEL_TAB_HEIGHT);
        for y in tab_top..top {
            for x in left..=right {
                image.put_pixel(x, y, OVERLAY_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_outlines_box() {
        let mut image = RgbImage::new(100, 100);
        Overlay::new(BoundingBox::new(20.0, 40.0, 80.0, 70.0), "plate").render(&mut image);

        assert_eq!(*image.get_pixel(20, 40), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(80, 70), OVERLAY_COLOR);
        assert_eq!(*image.get_pixel(23, 55), OVERLAY_COLOR);
        // Interior untouched
        assert_eq!(*image.get_pixel(50, 55), Rgb([0, 0, 0]));
        // Label tab above the box
        assert_eq!(*image.get_pixel(50, 30), OVERLAY_COLOR);
    }

    #[test]
    fn test_render_clamps_to_image() {
        let mut image = RgbImage::new(10, 10);
        Overlay::new(BoundingBox::new(-5.0, -5.0, 50.0, 50.0), "plate").render(&mut image);
        assert_eq!(*image.get_pixel(9, 9), OVERLAY_COLOR);
    }
}
