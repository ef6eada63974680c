//! Plate recognition client interface.
//!
//! The recognizer itself is an external service: it takes one still
//! image and answers with the plate text it read plus, optionally, the
//! box where it found the plate. This module defines that contract and
//! the transport error taxonomy; the capture scheduler decides what to
//! do with each answer.

mod scripted;

pub use scripted::{ScriptStep, ScriptedRecognizer};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Text the recognizer returns when it found no plate.
pub const SENTINEL_NOT_RECOGNIZED: &str = "인식실패";

/// Text the recognizer returns when it failed internally.
pub const SENTINEL_INTERNAL_ERROR: &str = "오류발생";

/// Largest coordinate magnitude accepted from the wire.
pub const MAX_BOX_COORDINATE: f64 = u32::MAX as f64;

/// Axis-aligned plate box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a box from the wire form `[x1, y1, x2, y2]`.
    ///
    /// Every coordinate must be finite and within `MAX_BOX_COORDINATE`.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let sane = |v: &f64| v.is_finite() && v.abs() <= MAX_BOX_COORDINATE;
        match values {
            [x1, y1, x2, y2] if values.iter().all(sane) => Some(Self::new(*x1, *y1, *x2, *y2)),
            _ => None,
        }
    }

    /// Integer corners, ordered so that the first corner is top-left.
    pub fn to_pixels(&self) -> (i64, i64, i64, i64) {
        let (x1, x2) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (y1, y2) = (self.y1.min(self.y2), self.y1.max(self.y2));
        (
            x1.round() as i64,
            y1.round() as i64,
            x2.round() as i64,
            y2.round() as i64,
        )
    }
}

/// One answer from the recognizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    /// Raw recognized text, before any normalization.
    pub text: Option<String>,
    /// Where the plate was found, if the recognizer located one.
    pub bbox: Option<BoundingBox>,
}

impl Recognition {
    pub fn new(text: impl Into<String>, bbox: Option<BoundingBox>) -> Self {
        Self {
            text: Some(text.into()),
            bbox,
        }
    }

    /// The "no plate found" answer.
    pub fn not_recognized() -> Self {
        Self::new(SENTINEL_NOT_RECOGNIZED, None)
    }
}

/// Transport-level recognition failures.
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),
    #[error("recognition request failed: {0}")]
    Transport(String),
    #[error("recognizer answered with status {0}")]
    Status(u16),
    #[error("malformed recognizer response: {0}")]
    Malformed(String),
    #[error("failed to prepare image payload: {0}")]
    Payload(String),
}

/// Client for the external recognition service.
#[allow(async_fn_in_trait)]
pub trait Recognizer {
    /// Submits one encoded image and waits for the answer.
    async fn recognize(&self, image: &[u8]) -> Result<Recognition, RecognitionError>;
}

impl<R: Recognizer> Recognizer for Arc<R> {
    async fn recognize(&self, image: &[u8]) -> Result<Recognition, RecognitionError> {
        (**self).recognize(image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_from_wire() {
        let bbox = BoundingBox::from_slice(&[50.0, 50.0, 150.0, 90.0]).unwrap();
        assert_eq!(bbox, BoundingBox::new(50.0, 50.0, 150.0, 90.0));
    }

    #[test]
    fn test_box_wrong_arity_rejected() {
        assert!(BoundingBox::from_slice(&[1.0, 2.0, 3.0]).is_none());
        assert!(BoundingBox::from_slice(&[1.0, 2.0, 3.0, f64::NAN]).is_none());
    }

    #[test]
    fn test_box_out_of_pixel_range_rejected() {
        assert!(BoundingBox::from_slice(&[0.0, 0.0, 1e19, 10.0]).is_none());
        assert!(BoundingBox::from_slice(&[-1e30, 0.0, 1e30, 10.0]).is_none());
        assert!(BoundingBox::from_slice(&[0.0, 0.0, MAX_BOX_COORDINATE, 10.0]).is_some());
    }

    #[test]
    fn test_large_coordinates_keep_precision() {
        let bbox = BoundingBox::from_slice(&[16_777_217.0, 0.0, 16_777_219.0, 4.0]).unwrap();
        assert_eq!(bbox.to_pixels(), (16_777_217, 0, 16_777_219, 4));
    }

    #[test]
    fn test_inverted_box_is_reordered() {
        let bbox = BoundingBox::new(150.0, 90.0, 50.0, 50.0);
        assert_eq!(bbox.to_pixels(), (50, 50, 150, 90));
    }
}
