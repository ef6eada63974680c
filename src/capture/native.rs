//! Native camera backend built on nokhwa.

use super::camera::{CameraBackend, CameraError, DeviceConstraint, LiveStream, StreamRequest};
use super::{CaptureFrame, VideoDevice};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

/// Backend that talks to the operating system's video inputs.
#[derive(Debug, Clone, Copy)]
pub struct NativeBackend {
    api: ApiBackend,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self {
            api: ApiBackend::Auto,
        }
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a nokhwa error message onto the device error taxonomy.
fn classify(message: String) -> CameraError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CameraError::PermissionDenied(message)
    } else if lower.contains("busy") || lower.contains("in use") {
        CameraError::DeviceBusy(message)
    } else if lower.contains("not found") || lower.contains("no such") {
        CameraError::DeviceNotFound(message)
    } else {
        CameraError::OpenFailed(message)
    }
}

impl CameraBackend for NativeBackend {
    fn enumerate(&self) -> Result<Vec<VideoDevice>, CameraError> {
        let cameras =
            nokhwa::query(self.api).map_err(|e| CameraError::EnumerationFailed(e.to_string()))?;

        Ok(cameras
            .iter()
            .map(|info| VideoDevice::new(info.index().as_string(), info.human_name()))
            .collect())
    }

    fn open(&self, request: &StreamRequest) -> Result<Box<dyn LiveStream>, CameraError> {
        // No facing metadata is exposed natively; index 0 is the system default
        let (index, device_id) = match &request.device {
            DeviceConstraint::Exact(id) => {
                let index = id
                    .parse::<u32>()
                    .map(CameraIndex::Index)
                    .unwrap_or_else(|_| CameraIndex::String(id.clone()));
                (index, Some(id.clone()))
            }
            DeviceConstraint::FacingEnvironment => (CameraIndex::Index(0), None),
        };

        let format = CameraFormat::new(
            Resolution::new(request.ideal_width, request.ideal_height),
            FrameFormat::MJPEG,
            30,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(index, requested).map_err(|e| classify(e.to_string()))?;
        camera.open_stream().map_err(|e| classify(e.to_string()))?;

        tracing::info!(
            name = %camera.info().human_name(),
            resolution = ?camera.resolution(),
            "Native camera opened"
        );

        Ok(Box::new(NativeStream {
            camera: Some(camera),
            device_id,
            sequence: 0,
        }))
    }
}

/// Live stream over a nokhwa camera.
pub struct NativeStream {
    camera: Option<Camera>,
    device_id: Option<String>,
    sequence: u64,
}

impl LiveStream for NativeStream {
    fn grab(&mut self) -> Result<Option<CaptureFrame>, CameraError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| CameraError::CaptureFailed("stream stopped".into()))?;

        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                // The first frames after opening are routinely unavailable
                tracing::trace!(error = %e, "Frame not ready");
                return Ok(None);
            }
        };
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        self.sequence += 1;
        CaptureFrame::from_rgb(decoded.into_raw(), width, height, self.sequence)
            .map(Some)
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))
    }

    fn stop(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream");
            }
        }
    }

    fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}
