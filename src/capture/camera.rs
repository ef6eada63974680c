//! Camera backend abstraction.
//!
//! A [`CameraBackend`] enumerates devices and opens live streams; a
//! [`LiveStream`] hands out frames until it is stopped. The mock
//! implementation lets the whole pipeline run without hardware.

use super::{CaptureFrame, VideoDevice};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("camera device is busy: {0}")]
    DeviceBusy(String),
    #[error("camera access requires a secure context")]
    InsecureContext,
    #[error("failed to enumerate cameras: {0}")]
    EnumerationFailed(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
}

impl CameraError {
    /// Category the UI should render for this failure.
    pub fn notice(&self) -> CameraNotice {
        match self {
            CameraError::PermissionDenied(_) => CameraNotice::PermissionDenied,
            CameraError::DeviceNotFound(_) => CameraNotice::DeviceNotFound,
            CameraError::DeviceBusy(_) => CameraNotice::DeviceBusy,
            CameraError::InsecureContext => CameraNotice::InsecureContext,
            CameraError::EnumerationFailed(_)
            | CameraError::OpenFailed(_)
            | CameraError::CaptureFailed(_) => CameraNotice::Unknown,
        }
    }
}

/// User-facing categories for camera start failures.
///
/// Every category is recoverable by retrying the camera start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraNotice {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    InsecureContext,
    Unknown,
}

impl CameraNotice {
    /// Default hint text for the category.
    pub fn hint(self) -> &'static str {
        match self {
            CameraNotice::PermissionDenied => {
                "Camera permission is blocked. Allow camera access in the site or system settings."
            }
            CameraNotice::DeviceNotFound => "No camera device was found.",
            CameraNotice::DeviceBusy => {
                "The camera is in use by another application. Try again shortly."
            }
            CameraNotice::InsecureContext => "Camera access only works over a secure (HTTPS) connection.",
            CameraNotice::Unknown => "Could not start the camera. Check the camera permissions.",
        }
    }
}

/// Which device a stream request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceConstraint {
    /// Pin this exact device id.
    Exact(String),
    /// Let the platform pick an environment-facing camera.
    FacingEnvironment,
}

/// Parameters for opening a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub device: DeviceConstraint,
    /// Ideal width; the backend may deliver something else.
    pub ideal_width: u32,
    /// Ideal height; the backend may deliver something else.
    pub ideal_height: u32,
}

/// A running video stream.
pub trait LiveStream {
    /// Grabs the current frame, or `None` if no data is ready yet.
    fn grab(&mut self) -> Result<Option<CaptureFrame>, CameraError>;

    /// Releases all tracks. Calling it twice is harmless.
    fn stop(&mut self);

    /// Device id this stream was opened on, when known.
    fn device_id(&self) -> Option<&str>;
}

/// Trait for camera backends.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait CameraBackend {
    /// Lists available video inputs.
    fn enumerate(&self) -> Result<Vec<VideoDevice>, CameraError>;

    /// Opens a live stream for the request.
    fn open(&self, request: &StreamRequest) -> Result<Box<dyn LiveStream>, CameraError>;
}

/// Kind of failure a [`MockBackend`] should inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Enumerate,
    PermissionDenied,
    Busy,
    InsecureContext,
}

/// Mock backend that generates synthetic frames.
#[derive(Debug, Clone)]
pub struct MockBackend {
    devices: Vec<VideoDevice>,
    failure: Option<MockFailure>,
    frame_size: (u32, u32),
    warmup_frames: u32,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(vec![
            VideoDevice::new("front", "Front Camera"),
            VideoDevice::new("back-wide", "Back Ultra Wide Camera"),
            VideoDevice::new("back", "Back Camera"),
        ])
    }
}

impl MockBackend {
    pub fn new(devices: Vec<VideoDevice>) -> Self {
        Self {
            devices,
            failure: None,
            frame_size: (640, 480),
            warmup_frames: 0,
            live: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every subsequent call fail with `failure`.
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Sets the size of generated frames.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    /// Number of grabs that report "not ready" after a stream opens.
    pub fn with_warmup(mut self, frames: u32) -> Self {
        self.warmup_frames = frames;
        self
    }

    /// Streams currently open and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Streams opened over the backend's lifetime.
    pub fn total_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl CameraBackend for MockBackend {
    fn enumerate(&self) -> Result<Vec<VideoDevice>, CameraError> {
        match self.failure {
            Some(MockFailure::Enumerate) => {
                Err(CameraError::EnumerationFailed("mock enumeration failure".into()))
            }
            _ => Ok(self.devices.clone()),
        }
    }

    fn open(&self, request: &StreamRequest) -> Result<Box<dyn LiveStream>, CameraError> {
        match self.failure {
            Some(MockFailure::PermissionDenied) => {
                return Err(CameraError::PermissionDenied("mock permission denied".into()))
            }
            Some(MockFailure::Busy) => return Err(CameraError::DeviceBusy("mock device in use".into())),
            Some(MockFailure::InsecureContext) => return Err(CameraError::InsecureContext),
            _ => {}
        }

        let device_id = match &request.device {
            DeviceConstraint::Exact(id) => {
                if !self.devices.iter().any(|d| &d.id == id) {
                    return Err(CameraError::DeviceNotFound(id.clone()));
                }
                Some(id.clone())
            }
            DeviceConstraint::FacingEnvironment => None,
        };

        self.live.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        tracing::info!(device = ?device_id, "MockBackend stream opened");

        Ok(Box::new(MockStream {
            device_id,
            width: self.frame_size.0,
            height: self.frame_size.1,
            warmup_remaining: self.warmup_frames,
            sequence: 0,
            live: Some(Arc::clone(&self.live)),
        }))
    }
}

/// Stream produced by [`MockBackend`].
#[derive(Debug)]
pub struct MockStream {
    device_id: Option<String>,
    width: u32,
    height: u32,
    warmup_remaining: u32,
    sequence: u64,
    live: Option<Arc<AtomicUsize>>,
}

impl LiveStream for MockStream {
    fn grab(&mut self) -> Result<Option<CaptureFrame>, CameraError> {
        if self.live.is_none() {
            return Err(CameraError::CaptureFailed("stream stopped".into()));
        }
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Ok(None);
        }

        // Deterministic pattern, only for exercising frame handling
        let pixel_count = (self.width as usize) * (self.height as usize);
        let pixels: Vec<u8> = (0..pixel_count * 3)
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        CaptureFrame::from_rgb(pixels, self.width, self.height, self.sequence)
            .map(Some)
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))
    }

    fn stop(&mut self) {
        if let Some(live) = self.live.take() {
            live.fetch_sub(1, Ordering::SeqCst);
            tracing::info!(device = ?self.device_id, "MockBackend stream stopped");
        }
    }

    fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(id: &str) -> StreamRequest {
        StreamRequest {
            device: DeviceConstraint::Exact(id.to_string()),
            ideal_width: 1280,
            ideal_height: 720,
        }
    }

    #[test]
    fn test_mock_stream_lifecycle() {
        let backend = MockBackend::default().with_frame_size(16, 8).with_warmup(1);
        let mut stream = backend.open(&exact("back")).unwrap();
        assert_eq!(backend.live_streams(), 1);
        assert_eq!(stream.device_id(), Some("back"));

        assert!(stream.grab().unwrap().is_none());
        let frame = stream.grab().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 8));
        assert_eq!(frame.sequence(), 1);

        stream.stop();
        stream.stop();
        assert_eq!(backend.live_streams(), 0);
        assert!(stream.grab().is_err());
    }

    #[test]
    fn test_unknown_device_not_found() {
        let backend = MockBackend::default();
        let err = backend.open(&exact("missing")).err().unwrap();
        assert_eq!(err.notice(), CameraNotice::DeviceNotFound);
    }

    #[test]
    fn test_notice_categories_are_distinct() {
        let notices = [
            CameraError::PermissionDenied(String::new()).notice(),
            CameraError::DeviceNotFound(String::new()).notice(),
            CameraError::DeviceBusy(String::new()).notice(),
            CameraError::InsecureContext.notice(),
            CameraError::OpenFailed(String::new()).notice(),
        ];
        let unique: std::collections::HashSet<_> = notices.iter().collect();
        assert_eq!(unique.len(), notices.len());
    }

    #[test]
    fn test_dropping_stream_releases_it() {
        let backend = MockBackend::default();
        {
            let _stream = backend.open(&exact("front")).unwrap();
            assert_eq!(backend.live_streams(), 1);
        }
        assert_eq!(backend.live_streams(), 0);
    }
}
