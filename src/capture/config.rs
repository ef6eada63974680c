//! Capture and scan configuration.
//!
//! The resolution is only a hint passed to the camera backend; the
//! scan timings drive the capture scheduler and are validated up front
//! so a bad file fails at load time rather than mid-session.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default label drawn next to a detected plate box.
pub const DEFAULT_OVERLAY_LABEL: &str = "번호판 인식됨";

/// Configuration for opening the live stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device to pin instead of running the selection heuristic.
    pub device_id: Option<String>,
    /// Ideal frame width in pixels (best effort).
    pub width: u32,
    /// Ideal frame height in pixels (best effort).
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            width: 1280,
            height: 720,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified resolution hint.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if matches!(&self.device_id, Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::EmptyDeviceId);
        }
        Ok(())
    }
}

/// Timing and validation settings for the capture loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Period between capture ticks in milliseconds.
    pub interval_ms: u64,
    /// Upper bound on one recognition round trip in milliseconds.
    pub timeout_ms: u64,
    /// Minimum normalized plate length accepted as a candidate.
    pub min_plate_len: usize,
    /// Pixels added on each side of a plate box when cropping the preview.
    pub crop_padding: u32,
    /// Label drawn beside the overlay rectangle.
    pub overlay_label: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: 800,
            timeout_ms: 5000,
            min_plate_len: 4,
            crop_padding: 10,
            overlay_label: DEFAULT_OVERLAY_LABEL.to_string(),
        }
    }
}

impl ScanConfig {
    /// Tick period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.min_plate_len == 0 {
            return Err(ConfigError::InvalidPlateLength);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("pinned device id must not be empty")]
    EmptyDeviceId,
    #[error("scan interval must be greater than zero")]
    InvalidInterval,
    #[error("recognition timeout must be greater than zero")]
    InvalidTimeout,
    #[error("minimum plate length must be greater than zero")]
    InvalidPlateLength,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Location of the recognizer / registry service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; empty means same origin as the configured proxy.
    pub base_url: String,
}

impl BackendConfig {
    /// Base URL with any trailing slash removed.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.strip_suffix('/').unwrap_or(&self.base_url)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of scan sessions the demo runs before exiting.
    pub rounds: u32,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        config.scan.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_scan_defaults() {
        let scan = ScanConfig::default();
        assert_eq!(scan.interval(), Duration::from_millis(800));
        assert_eq!(scan.timeout(), Duration::from_secs(5));
        assert_eq!(scan.min_plate_len, 4);
        assert_eq!(scan.crop_padding, 10);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [scan]
            interval_ms = 500

            [backend]
            base_url = "http://localhost:8000/"
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.interval_ms, 500);
        assert_eq!(config.scan.timeout_ms, 5000);
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.backend.normalized_base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_zero_timeout_rejected_on_load() {
        let result = FileConfig::from_toml("[scan]\ntimeout_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = FileConfig::from_toml("[scan\ninterval_ms = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
