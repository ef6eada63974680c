//! Video input records and the rear-camera selection heuristic.
//!
//! Selection is a pure function over `{id, label}` pairs so it can be
//! tested without any camera attached. Labels are free-form strings
//! supplied by the platform and vary wildly between devices.

use serde::{Deserialize, Serialize};

/// Label fragments that identify a rear-facing camera.
const BACK_CAMERA_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Label fragments that identify an auxiliary lens (wide, tele, macro-ish)
/// with poor close focus for plates.
const AUXILIARY_LENS_HINTS: [&str; 4] = ["wide", "ultra", "tele", "0.5x"];

/// A video input discovered by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDevice {
    /// Backend-specific identifier used to pin the device.
    pub id: String,
    /// Human readable label; may be empty before permission is granted.
    pub label: String,
}

impl VideoDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// True if the label marks a rear-facing camera.
    pub fn is_back_facing(&self) -> bool {
        label_contains_any(&self.label, &BACK_CAMERA_HINTS)
    }

    /// True if the label marks an auxiliary (wide/ultra/tele) lens.
    pub fn is_auxiliary_lens(&self) -> bool {
        label_contains_any(&self.label, &AUXILIARY_LENS_HINTS)
    }

    /// True if the platform gave this device a usable label.
    pub fn has_label(&self) -> bool {
        !self.label.trim().is_empty()
    }
}

fn label_contains_any(label: &str, needles: &[&str]) -> bool {
    let label = label.to_lowercase();
    needles.iter().any(|needle| label.contains(needle))
}

/// Picks the device best suited to plate capture.
///
/// Prefers a rear camera that is not an auxiliary lens, then any rear
/// camera, then the first device. Returns `None` for an empty list.
pub fn select_best(devices: &[VideoDevice]) -> Option<&VideoDevice> {
    let mut back = devices.iter().filter(|d| d.is_back_facing()).peekable();

    match back.peek() {
        Some(&first_back) => back
            .find(|d| !d.is_auxiliary_lens())
            .or(Some(first_back)),
        None => devices.first(),
    }
}

/// Host platform family, as far as device labels are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Labels are reliable once enumerated.
    #[default]
    Standard,
    /// Labels are generic or empty until the first permission grant
    /// (iPhone, iPad, iPod).
    LimitedLabels,
}

impl Platform {
    /// Classifies a user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ["iphone", "ipad", "ipod"].iter().any(|m| ua.contains(m)) {
            Platform::LimitedLabels
        } else {
            Platform::Standard
        }
    }

    /// True if enumerated labels can drive device selection.
    pub fn labels_reliable(self) -> bool {
        matches!(self, Platform::Standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices(labels: &[&str]) -> Vec<VideoDevice> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| VideoDevice::new(format!("cam{}", i), *label))
            .collect()
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_prefers_main_back_camera() {
        let list = devices(&[
            "Front Camera",
            "Back Ultra Wide Camera",
            "Back Telephoto Camera",
            "Back Camera",
        ]);
        assert_eq!(select_best(&list).unwrap().id, "cam3");
    }

    #[test]
    fn test_falls_back_to_first_back_camera() {
        let list = devices(&["front", "camera2 0.5x, facing back", "Rear Wide"]);
        assert_eq!(select_best(&list).unwrap().id, "cam1");
    }

    #[test]
    fn test_environment_label_counts_as_back() {
        let list = devices(&["camera 1, facing front", "camera 0, facing ENVIRONMENT"]);
        assert_eq!(select_best(&list).unwrap().id, "cam1");
    }

    #[test]
    fn test_no_back_camera_takes_first() {
        let list = devices(&["Integrated Webcam", "USB Capture"]);
        assert_eq!(select_best(&list).unwrap().id, "cam0");
    }

    #[test]
    fn test_blank_labels_take_first() {
        let list = devices(&["", ""]);
        assert_eq!(select_best(&list).unwrap().id, "cam0");
        assert!(!list[0].has_label());
    }

    #[test]
    fn test_platform_sniffing() {
        let ios = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        let android = "Mozilla/5.0 (Linux; Android 14; SM-S918N) AppleWebKit/537.36";
        assert_eq!(Platform::from_user_agent(ios), Platform::LimitedLabels);
        assert_eq!(Platform::from_user_agent(android), Platform::Standard);
        assert!(!Platform::LimitedLabels.labels_reliable());
    }
}
