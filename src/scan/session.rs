//! Scan session state machine.
//!
//! ```text
//!   Scanning ──valid candidate──▶ Pending ──confirm──▶ Checked
//!      ▲                                                  │
//!      └──────────────────── rescan (from any state) ─────┘
//! ```
//!
//! The session is the only owner of the candidate, the verdict, the
//! overlay and the armed flag. Every rescan starts a new epoch; results
//! produced for an older epoch, or arriving once the session has left
//! `Scanning`, are discarded.

use super::overlay::Overlay;
use crate::capture::{extract_preview, CaptureFrame, ScanConfig};
use crate::plate::{match_plate, PlateValidator, Rejection};
use crate::recognition::Recognition;
use crate::registry::RegistryRecord;
use image::RgbImage;
use tracing::{debug, info};

/// Lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    /// Camera live, scheduler armed, no candidate.
    Scanning,
    /// A candidate awaits user confirmation.
    Pending,
    /// The candidate was checked against the registry.
    Checked,
}

impl ScanStatus {
    /// Numeric code used by the metrics gauge.
    pub fn code(self) -> i64 {
        match self {
            ScanStatus::Scanning => 0,
            ScanStatus::Pending => 1,
            ScanStatus::Checked => 2,
        }
    }
}

/// Outcome of checking a candidate against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Registered(RegistryRecord),
    /// Not an error: the plate simply is not in the registry.
    Unregistered,
}

impl Verdict {
    /// The matched record, if any.
    pub fn record(&self) -> Option<&RegistryRecord> {
        match self {
            Verdict::Registered(record) => Some(record),
            Verdict::Unregistered => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Verdict::Registered(_))
    }
}

/// A validated plate proposal awaiting confirmation.
#[derive(Clone)]
pub struct Candidate {
    text: String,
    preview: RgbImage,
}

impl Candidate {
    /// Current text, possibly corrected by the user.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Padded crop of the plate, or the full frame without a box.
    pub fn preview(&self) -> &RgbImage {
        &self.preview
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("text", &self.text)
            .field("preview", &self.preview.dimensions())
            .finish()
    }
}

/// What a session did with one recognition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Result belonged to an old epoch or the session stopped scanning.
    Discarded,
    /// Result did not pass validation; scanning continues.
    Rejected(Rejection),
    /// Result became the candidate; the session is now pending.
    Accepted(String),
}

/// Per-session settings derived from [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    pub validator: PlateValidator,
    pub crop_padding: u32,
    pub overlay_label: String,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanPolicy {
    fn from(config: &ScanConfig) -> Self {
        Self {
            validator: PlateValidator::new(config.min_plate_len),
            crop_padding: config.crop_padding,
            overlay_label: config.overlay_label.clone(),
        }
    }
}

/// State of one scan screen activation.
#[derive(Debug)]
pub struct ScanSession {
    status: ScanStatus,
    candidate: Option<Candidate>,
    verdict: Option<Verdict>,
    overlay: Option<Overlay>,
    armed: bool,
    epoch: u64,
    policy: ScanPolicy,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(ScanPolicy::default())
    }
}

impl ScanSession {
    /// Starts a session in `Scanning` with the scheduler armed.
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            status: ScanStatus::Scanning,
            candidate: None,
            verdict: None,
            overlay: None,
            armed: true,
            epoch: 0,
            policy,
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    /// Result of the last check; set only while `Checked`.
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// True while capture ticks may fire.
    pub fn is_armed(&self) -> bool {
        self.armed && self.status == ScanStatus::Scanning
    }

    /// Counter bumped by every rescan.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Stops capture ticks without leaving the current state.
    pub fn disarm(&mut self) {
        if self.armed {
            debug!("Capture disarmed");
        }
        self.armed = false;
    }

    /// Re-enables capture ticks; only meaningful while scanning.
    pub fn arm(&mut self) {
        self.armed = self.status == ScanStatus::Scanning;
    }

    /// Applies one recognition result taken from `frame`.
    ///
    /// `epoch` is the session epoch observed when the attempt started.
    pub fn apply_recognition(
        &mut self,
        epoch: u64,
        frame: &CaptureFrame,
        recognition: &Recognition,
    ) -> Applied {
        if epoch != self.epoch || !self.is_armed() {
            debug!(epoch, current = self.epoch, status = ?self.status, "Stray recognition result discarded");
            return Applied::Discarded;
        }

        self.overlay = recognition
            .bbox
            .map(|bbox| Overlay::new(bbox, self.policy.overlay_label.clone()));

        let text = match self.policy.validator.validate(recognition.text.as_deref()) {
            Ok(text) => text,
            Err(rejection) => return Applied::Rejected(rejection),
        };

        let preview = extract_preview(frame, recognition.bbox.as_ref(), self.policy.crop_padding);
        self.candidate = Some(Candidate {
            text: text.clone(),
            preview,
        });
        self.status = ScanStatus::Pending;
        self.armed = false;

        info!(plate = %text, frame = frame.sequence(), "Plate candidate pending confirmation");
        Applied::Accepted(text)
    }

    /// Replaces the candidate text with a user correction.
    ///
    /// Returns false when there is no candidate to edit.
    pub fn edit_text(&mut self, text: impl Into<String>) -> bool {
        match self.candidate.as_mut() {
            Some(candidate) => {
                candidate.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Checks the candidate against `snapshot` and moves to `Checked`.
    ///
    /// Without a candidate the check runs on empty text, which never
    /// matches.
    pub fn confirm(&mut self, snapshot: &[RegistryRecord]) -> &Verdict {
        let text = self.candidate.as_ref().map_or("", |c| c.text.as_str());
        let verdict = match match_plate(text, snapshot) {
            Some(record) => Verdict::Registered(record.clone()),
            None => Verdict::Unregistered,
        };

        info!(
            plate = %text,
            registered = verdict.is_registered(),
            records = snapshot.len(),
            "Plate checked"
        );
        self.status = ScanStatus::Checked;
        self.armed = false;
        self.verdict.insert(verdict)
    }

    /// Re-runs the match for a checked session without changing state.
    pub fn refresh(&mut self, snapshot: &[RegistryRecord]) -> Option<&Verdict> {
        if self.status != ScanStatus::Checked {
            return None;
        }
        Some(self.confirm(snapshot))
    }

    /// Returns to `Scanning`, dropping candidate, verdict and overlay.
    pub fn rescan(&mut self) {
        self.status = ScanStatus::Scanning;
        self.candidate = None;
        self.verdict = None;
        self.overlay = None;
        self.armed = true;
        self.epoch += 1;
        info!(epoch = self.epoch, "Rescan started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::BoundingBox;
    use crate::registry::NewVehicle;

    fn frame(width: u32, height: u32) -> CaptureFrame {
        CaptureFrame::from_rgb(vec![7u8; (width * height * 3) as usize], width, height, 1).unwrap()
    }

    fn registry() -> Vec<RegistryRecord> {
        vec![NewVehicle::unidentified("12가 3456", "").with_id("v1")]
    }

    #[test]
    fn test_starts_scanning_and_armed() {
        let session = ScanSession::default();
        assert_eq!(session.status(), ScanStatus::Scanning);
        assert!(session.is_armed());
        assert!(session.candidate().is_none());
    }

    #[test]
    fn test_valid_result_becomes_pending_with_crop() {
        let mut session = ScanSession::default();
        let recognition = Recognition::new("12가3456", Some(BoundingBox::new(50.0, 50.0, 150.0, 90.0)));

        let applied = session.apply_recognition(0, &frame(640, 480), &recognition);

        assert_eq!(applied, Applied::Accepted("12가3456".into()));
        assert_eq!(session.status(), ScanStatus::Pending);
        assert!(!session.is_armed());
        let candidate = session.candidate().unwrap();
        assert_eq!(candidate.text(), "12가3456");
        assert_eq!(candidate.preview().dimensions(), (120, 60));
        assert!(session.overlay().is_some());
    }

    #[test]
    fn test_oversized_box_crops_to_frame() {
        let mut session = ScanSession::default();
        let recognition = Recognition::new("12가3456", Some(BoundingBox::new(0.0, 0.0, 1e19, 10.0)));

        let applied = session.apply_recognition(0, &frame(64, 48), &recognition);

        assert_eq!(applied, Applied::Accepted("12가3456".into()));
        assert_eq!(session.candidate().unwrap().preview().dimensions(), (64, 30));
    }

    #[test]
    fn test_invalid_result_keeps_scanning() {
        let mut session = ScanSession::default();
        let applied = session.apply_recognition(0, &frame(8, 8), &Recognition::not_recognized());

        assert!(matches!(applied, Applied::Rejected(Rejection::Sentinel(_))));
        assert_eq!(session.status(), ScanStatus::Scanning);
        assert!(session.is_armed());
        assert!(session.candidate().is_none());
    }

    #[test]
    fn test_box_without_text_updates_then_clears_overlay() {
        let mut session = ScanSession::default();
        let boxed = Recognition {
            text: None,
            bbox: Some(BoundingBox::new(1.0, 1.0, 4.0, 4.0)),
        };
        session.apply_recognition(0, &frame(8, 8), &boxed);
        assert_eq!(session.overlay().unwrap().label, crate::capture::DEFAULT_OVERLAY_LABEL);

        session.apply_recognition(0, &frame(8, 8), &Recognition::new("12", None));
        assert!(session.overlay().is_none());
    }

    #[test]
    fn test_stale_epoch_discarded() {
        let mut session = ScanSession::default();
        session.rescan();
        let applied = session.apply_recognition(0, &frame(8, 8), &Recognition::new("12가3456", None));
        assert_eq!(applied, Applied::Discarded);
        assert_eq!(session.status(), ScanStatus::Scanning);
    }

    #[test]
    fn test_result_after_disarm_discarded() {
        let mut session = ScanSession::default();
        session.disarm();
        let recognition = Recognition::new("12가3456", Some(BoundingBox::new(1.0, 1.0, 4.0, 4.0)));
        assert_eq!(session.apply_recognition(0, &frame(8, 8), &recognition), Applied::Discarded);
        assert!(session.overlay().is_none());
    }

    #[test]
    fn test_confirm_and_refresh() {
        let mut session = ScanSession::default();
        session.apply_recognition(0, &frame(8, 8), &Recognition::new("서울12가3456", None));

        assert!(session.edit_text("12가3456"));
        let verdict = session.confirm(&registry()).clone();
        assert_eq!(verdict.record().unwrap().id, "v1");
        assert_eq!(session.status(), ScanStatus::Checked);
        // Candidate is kept after the check
        assert_eq!(session.candidate().unwrap().text(), "12가3456");

        session.edit_text("99허9999");
        assert_eq!(session.refresh(&registry()), Some(&Verdict::Unregistered));
        assert_eq!(session.status(), ScanStatus::Checked);
    }

    #[test]
    fn test_refresh_outside_checked_is_noop() {
        let mut session = ScanSession::default();
        assert!(session.refresh(&registry()).is_none());
        assert_eq!(session.status(), ScanStatus::Scanning);
    }

    #[test]
    fn test_confirm_without_candidate_is_unregistered() {
        let mut session = ScanSession::default();
        let everything = vec![NewVehicle::unidentified("", "").with_id("blank")];
        assert_eq!(session.confirm(&everything), &Verdict::Unregistered);
        assert_eq!(session.status(), ScanStatus::Checked);
        assert!(!session.is_armed());
    }

    #[test]
    fn test_rescan_from_checked_resets_everything() {
        let mut session = ScanSession::default();
        session.apply_recognition(
            0,
            &frame(8, 8),
            &Recognition::new("12가3456", Some(BoundingBox::new(1.0, 1.0, 4.0, 4.0))),
        );
        session.confirm(&registry());

        session.rescan();

        assert_eq!(session.status(), ScanStatus::Scanning);
        assert!(session.is_armed());
        assert!(session.candidate().is_none());
        assert!(session.verdict().is_none());
        assert!(session.overlay().is_none());
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn test_edit_without_candidate_rejected() {
        let mut session = ScanSession::default();
        assert!(!session.edit_text("1234"));
    }
}
