//! Camera input and frame handling.
//!
//! This module owns everything between the video hardware and the
//! capture scheduler: device discovery and selection, the single live
//! stream, still-frame sampling and the padded preview crop.

mod camera;
mod config;
mod crop;
mod device;
mod frame;
mod manager;
#[cfg(feature = "camera")]
mod native;

pub use camera::{
    CameraBackend, CameraError, CameraNotice, DeviceConstraint, LiveStream, MockBackend,
    MockFailure, MockStream, StreamRequest,
};
pub use config::{
    BackendConfig, CaptureConfig, ConfigError, FileConfig, OutputConfig, ScanConfig,
    DEFAULT_OVERLAY_LABEL,
};
pub use crop::{extract_preview, CropRegion};
pub use device::{select_best, Platform, VideoDevice};
pub use frame::{encode_png, CaptureFrame, FrameError};
pub use manager::{CameraManager, FrameSampler};
#[cfg(feature = "camera")]
pub use native::{NativeBackend, NativeStream};
