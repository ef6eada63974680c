//! Frame type representing one still grabbed from the live stream.

use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::time::Instant;
use thiserror::Error;

/// Errors raised while building or encoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("pixel buffer of {len} bytes does not fit {width}x{height} RGB")]
    BufferSize { len: usize, width: u32, height: u32 },
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// A single RGB frame captured from the camera.
///
/// Frames are ephemeral: one lives for the duration of a recognition
/// attempt unless it is promoted to a candidate preview.
#[derive(Clone)]
pub struct CaptureFrame {
    /// Packed RGB8 pixels.
    image: RgbImage,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number assigned by the stream.
    sequence: u64,
}

impl CaptureFrame {
    /// Wraps an existing RGB image.
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Builds a frame from a packed RGB8 buffer.
    pub fn from_rgb(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Result<Self, FrameError> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or(FrameError::BufferSize {
            len,
            width,
            height,
        })?;
        Ok(Self::new(image, sequence))
    }

    /// Returns the underlying image.
    #[inline]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Consumes the frame and returns its image.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Serializes the frame as a PNG payload for the recognizer.
    pub fn encode_png(&self) -> Result<Vec<u8>, FrameError> {
        encode_png(&self.image)
    }
}

/// Encodes an RGB image as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, FrameError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

impl std::fmt::Debug for CaptureFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = CaptureFrame::from_rgb(vec![0u8; 640 * 480 * 3], 640, 480, 1).unwrap();

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
    }

    #[test]
    fn test_frame_invalid_size() {
        let result = CaptureFrame::from_rgb(vec![0u8; 100], 640, 480, 1);
        assert!(matches!(result, Err(FrameError::BufferSize { len: 100, .. })));
    }

    #[test]
    fn test_png_signature() {
        let frame = CaptureFrame::from_rgb(vec![128u8; 8 * 4 * 3], 8, 4, 1).unwrap();
        let png = frame.encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
