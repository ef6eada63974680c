//! Padded crop around a detected plate box.

use super::CaptureFrame;
use crate::recognition::BoundingBox;
use image::{imageops, RgbImage};

/// Pixel region of a frame, already clamped to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Pads `bbox` by `padding` on every side and clamps to the frame.
    ///
    /// Returns `None` when nothing of the box lies inside the frame.
    pub fn padded(bbox: &BoundingBox, padding: u32, frame_width: u32, frame_height: u32) -> Option<Self> {
        let (x1, y1, x2, y2) = bbox.to_pixels();
        let pad = i64::from(padding);

        let x = x1.saturating_sub(pad).max(0);
        let y = y1.saturating_sub(pad).max(0);
        let width = x2
            .saturating_sub(x1)
            .saturating_add(2 * pad)
            .min(i64::from(frame_width) - x);
        let height = y2
            .saturating_sub(y1)
            .saturating_add(2 * pad)
            .min(i64::from(frame_height) - y);

        if width <= 0 || height <= 0 {
            return None;
        }

        Some(Self {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Produces the preview image for a candidate.
///
/// With a usable box the preview is the padded crop; otherwise it is
/// the whole frame.
pub fn extract_preview(frame: &CaptureFrame, bbox: Option<&BoundingBox>, padding: u32) -> RgbImage {
    let region = bbox.and_then(|b| CropRegion::padded(b, padding, frame.width(), frame.height()));

    match region {
        Some(r) => imageops::crop_imm(frame.image(), r.x, r.y, r.width, r.height).to_image(),
        None => {
            if bbox.is_some() {
                tracing::debug!("Plate box outside frame, using full frame as preview");
            }
            frame.image().clone()
        }
    }
}
