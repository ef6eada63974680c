//! Scan session lifecycle.
//!
//! The [`CaptureScheduler`] feeds recognition results into a
//! [`ScanSession`]; [`ScanPipeline`] ties both to a camera and a vehicle
//! registry.

mod overlay;
mod pipeline;
mod scheduler;
mod session;

pub use overlay::{Overlay, OVERLAY_COLOR, OVERLAY_STROKE};
pub use pipeline::{ScanPipeline, VerdictCounts};
pub use scheduler::{CaptureScheduler, SchedulerStats, TickOutcome};
pub use session::{Applied, Candidate, ScanPolicy, ScanSession, ScanStatus, Verdict};
