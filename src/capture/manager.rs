//! Camera source manager.
//!
//! Owns the enumerated device list, the current selection and the single
//! live stream. Opening a stream always closes the previous one first.

use super::camera::{CameraBackend, CameraError, DeviceConstraint, LiveStream, StreamRequest};
use super::device::{select_best, Platform, VideoDevice};
use super::{CaptureConfig, CaptureFrame};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Source of still frames for the capture scheduler.
pub trait FrameSampler {
    /// Grabs one frame, or `None` if the stream has no data ready.
    fn sample(&self) -> Option<CaptureFrame>;
}

/// Manages device discovery, selection and the live stream.
pub struct CameraManager<B> {
    backend: B,
    platform: Platform,
    ideal_width: u32,
    ideal_height: u32,
    devices: Vec<VideoDevice>,
    selection: Option<String>,
    stream: Mutex<Option<Box<dyn LiveStream>>>,
}

impl<B: CameraBackend> CameraManager<B> {
    pub fn new(backend: B, platform: Platform, config: &CaptureConfig) -> Self {
        Self {
            backend,
            platform,
            ideal_width: config.width,
            ideal_height: config.height,
            devices: Vec::new(),
            selection: config.device_id.clone(),
            stream: Mutex::new(None),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Devices from the last enumeration.
    pub fn devices(&self) -> &[VideoDevice] {
        &self.devices
    }

    /// Currently selected device id.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Re-enumerates video inputs.
    ///
    /// Failures are logged and yield an empty list. A selection that no
    /// longer names an enumerated device is recomputed.
    pub fn enumerate(&mut self) -> &[VideoDevice] {
        self.devices = match self.backend.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "Camera enumeration failed");
                Vec::new()
            }
        };

        let still_present = self
            .selection
            .as_ref()
            .is_some_and(|id| self.devices.iter().any(|d| &d.id == id));
        if !still_present {
            self.selection = select_best(&self.devices).map(|d| d.id.clone());
        }

        info!(
            count = self.devices.len(),
            selection = ?self.selection,
            "Cameras enumerated"
        );
        &self.devices
    }

    /// True if enumerated labels can be trusted for selection.
    ///
    /// Limited-label platforms and enumerations that came back with
    /// blank labels fall back to an environment-facing request.
    pub fn labels_usable(&self) -> bool {
        self.platform.labels_reliable() && self.devices.iter().any(VideoDevice::has_label)
    }

    /// Brings the camera up for a new screen activation.
    pub fn activate(&mut self) -> Result<(), CameraError> {
        if !self.platform.labels_reliable() {
            debug!("Limited-label platform, requesting environment-facing camera");
            return self.start(None);
        }
        if self.devices.is_empty() {
            self.enumerate();
        }
        let target = if self.labels_usable() {
            self.selection.clone()
        } else {
            None
        };
        self.start(target.as_deref())
    }

    /// Opens a stream, stopping any existing one first.
    ///
    /// With no device id the request asks for an environment-facing camera.
    pub fn start(&mut self, device_id: Option<&str>) -> Result<(), CameraError> {
        self.stop();

        let request = StreamRequest {
            device: match device_id {
                Some(id) => DeviceConstraint::Exact(id.to_string()),
                None => DeviceConstraint::FacingEnvironment,
            },
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
        };

        match self.backend.open(&request) {
            Ok(stream) => {
                info!(device = ?request.device, "Camera stream started");
                *self.stream_slot() = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, notice = ?e.notice(), "Camera start failed");
                Err(e)
            }
        }
    }

    /// Releases the live stream, if any.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream_slot().take() {
            stream.stop();
            debug!("Camera stream stopped");
        }
    }

    /// True while a stream is open.
    pub fn is_live(&self) -> bool {
        self.stream_slot().is_some()
    }

    /// Advances the selection round-robin through the enumerated devices.
    ///
    /// No-op with one device or fewer. A live stream is reopened on the
    /// new device.
    pub fn switch_next(&mut self) -> Result<Option<&str>, CameraError> {
        if self.devices.len() <= 1 {
            return Ok(self.selection.as_deref());
        }

        let next = match self
            .selection
            .as_ref()
            .and_then(|id| self.devices.iter().position(|d| &d.id == id))
        {
            Some(index) => (index + 1) % self.devices.len(),
            None => 0,
        };
        let next_id = self.devices[next].id.clone();
        info!(device = %next_id, "Switching camera");
        self.selection = Some(next_id.clone());

        if self.is_live() {
            self.start(Some(&next_id))?;
        }
        Ok(self.selection.as_deref())
    }

    fn stream_slot(&self) -> MutexGuard<'_, Option<Box<dyn LiveStream>>> {
        self.stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<B: CameraBackend> FrameSampler for CameraManager<B> {
    fn sample(&self) -> Option<CaptureFrame> {
        let mut slot = self.stream_slot();
        let stream = slot.as_mut()?;
        match stream.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Frame grab failed");
                None
            }
        }
    }
}

impl<B> Drop for CameraManager<B> {
    fn drop(&mut self) {
        let slot = self.stream.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut stream) = slot.take() {
            stream.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::{CameraNotice, MockBackend, MockFailure};

    fn manager(backend: MockBackend) -> CameraManager<MockBackend> {
        CameraManager::new(backend, Platform::Standard, &CaptureConfig::default())
    }

    #[test]
    fn test_activate_selects_main_back_camera() {
        let mut camera = manager(MockBackend::default());
        camera.activate().unwrap();

        assert_eq!(camera.selection(), Some("back"));
        assert!(camera.is_live());
        assert!(camera.sample().is_some());
    }

    #[test]
    fn test_only_one_stream_at_a_time() {
        let backend = MockBackend::default();
        let mut camera = manager(backend.clone());
        camera.enumerate();

        camera.start(Some("back")).unwrap();
        camera.start(Some("front")).unwrap();
        camera.start(None).unwrap();

        assert_eq!(backend.live_streams(), 1);
        assert_eq!(backend.total_opened(), 3);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = MockBackend::default();
        let mut camera = manager(backend.clone());
        camera.stop();
        camera.start(None).unwrap();
        camera.stop();
        camera.stop();
        assert_eq!(backend.live_streams(), 0);
        assert!(camera.sample().is_none());
    }

    #[test]
    fn test_switch_next_wraps_around() {
        let mut camera = manager(MockBackend::default());
        camera.activate().unwrap();
        assert_eq!(camera.selection(), Some("back"));

        assert_eq!(camera.switch_next().unwrap(), Some("front"));
        assert_eq!(camera.switch_next().unwrap(), Some("back-wide"));
        assert_eq!(camera.switch_next().unwrap(), Some("back"));
        assert!(camera.is_live());
    }

    #[test]
    fn test_switch_next_noop_with_single_device() {
        let mut camera = manager(MockBackend::new(vec![VideoDevice::new("only", "Webcam")]));
        camera.enumerate();
        assert_eq!(camera.switch_next().unwrap(), Some("only"));
    }

    #[test]
    fn test_enumeration_failure_is_not_fatal() {
        let mut camera = manager(MockBackend::default().with_failure(MockFailure::Enumerate));
        assert!(camera.enumerate().is_empty());
        assert_eq!(camera.selection(), None);

        // No devices: still tries the environment-facing request
        camera.activate().unwrap();
        assert!(camera.is_live());
    }

    #[test]
    fn test_vanished_device_recomputes_selection() {
        let config = CaptureConfig {
            device_id: Some("usb-42".into()),
            ..CaptureConfig::default()
        };
        let mut camera = CameraManager::new(MockBackend::default(), Platform::Standard, &config);
        assert_eq!(camera.selection(), Some("usb-42"));

        camera.enumerate();
        assert_eq!(camera.selection(), Some("back"));
    }

    #[test]
    fn test_limited_label_platform_uses_environment_request() {
        let backend = MockBackend::default();
        let mut camera = CameraManager::new(
            backend.clone(),
            Platform::LimitedLabels,
            &CaptureConfig::default(),
        );
        camera.activate().unwrap();
        assert!(camera.devices().is_empty());
        assert!(camera.is_live());
        assert_eq!(backend.live_streams(), 1);
    }

    #[test]
    fn test_blank_labels_use_environment_request() {
        let mut camera = manager(MockBackend::new(vec![
            VideoDevice::new("a", ""),
            VideoDevice::new("b", ""),
        ]));
        camera.activate().unwrap();
        assert!(!camera.labels_usable());
        assert!(camera.is_live());
    }

    #[test]
    fn test_start_failure_keeps_camera_idle() {
        let mut camera = manager(MockBackend::default().with_failure(MockFailure::Busy));
        let err = camera.start(None).unwrap_err();
        assert_eq!(err.notice(), CameraNotice::DeviceBusy);
        assert!(!camera.is_live());
    }

    #[test]
    fn test_warmup_reports_not_ready() {
        let mut camera = manager(MockBackend::default().with_warmup(2));
        camera.activate().unwrap();
        assert!(camera.sample().is_none());
        assert!(camera.sample().is_none());
        assert!(camera.sample().is_some());
    }
}
