//! Prometheus metrics exporter for the scan pipeline.
//!
//! # Metrics Exposed
//!
//! ## Scheduler Metrics
//! - `plate_scan_ticks_total` - Capture ticks fired
//! - `plate_scan_skipped_busy_total` - Ticks skipped while a call was in flight
//! - `plate_scan_not_ready_total` - Ticks skipped with no frame ready
//! - `plate_scan_attempts_total` - Frames submitted to the recognizer
//! - `plate_scan_recognition_failures_total` - Failed recognition calls
//! - `plate_scan_timeouts_total` - Recognition calls abandoned at the timeout
//! - `plate_scan_rejections_total` - Answers that failed plate validation
//! - `plate_scan_discarded_total` - Stray answers dropped after a rescan
//! - `plate_scan_candidates_total` - Accepted candidates
//! - `plate_scan_in_flight` - Recognition call outstanding (1/0)
//!
//! ## Check Metrics
//! - `plate_scan_registered_total` - Checks that matched a registered vehicle
//! - `plate_scan_unregistered_total` - Checks that matched nothing
//!
//! ## Session Metrics
//! - `plate_scan_camera_live` - Camera stream open (1/0)
//! - `plate_scan_session_status` - 0=scanning, 1=pending, 2=checked
//!
//! # Example
//!
//! ```no_run
//! use plate_scan::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     ticks: 40,
//!     attempts: 25,
//!     candidates: 1,
//!     camera_live: true,
//!     ..MetricsSnapshot::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
