//! Metrics collection and registry.

use crate::scan::{SchedulerStats, ScanStatus, VerdictCounts};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of pipeline state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Capture ticks fired.
    pub ticks: u64,
    /// Ticks skipped because an attempt was in flight.
    pub skipped_busy: u64,
    /// Ticks skipped because the stream had no frame.
    pub not_ready: u64,
    /// Frames submitted to the recognizer.
    pub attempts: u64,
    /// Failed recognition calls, timeouts excluded.
    pub recognition_failures: u64,
    /// Recognition calls abandoned at the timeout.
    pub timeouts: u64,
    /// Answers that failed plate validation.
    pub rejections: u64,
    /// Answers that arrived after the session moved on.
    pub discarded: u64,
    /// Accepted candidates.
    pub candidates: u64,
    /// Checks that matched a registered vehicle.
    pub registered: u64,
    /// Checks that matched nothing.
    pub unregistered: u64,
    /// Whether a recognition call is outstanding.
    pub in_flight: bool,
    /// Whether the camera stream is open.
    pub camera_live: bool,
    /// Current session status.
    pub status: Option<ScanStatus>,
}

impl MetricsSnapshot {
    /// Builds a snapshot from pipeline counters.
    pub fn from_pipeline(
        stats: &SchedulerStats,
        verdicts: VerdictCounts,
        status: ScanStatus,
        camera_live: bool,
    ) -> Self {
        Self {
            ticks: stats.ticks,
            skipped_busy: stats.skipped_busy,
            not_ready: stats.not_ready,
            attempts: stats.attempts,
            recognition_failures: stats.failures,
            timeouts: stats.timeouts,
            rejections: stats.rejections,
            discarded: stats.discarded,
            candidates: stats.candidates,
            registered: verdicts.registered,
            unregistered: verdicts.unregistered,
            in_flight: stats.in_flight,
            camera_live,
            status: Some(status),
        }
    }
}

/// Prometheus metrics registry for the scan pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Scheduler metrics
    ticks_total: IntCounter,
    skipped_busy_total: IntCounter,
    not_ready_total: IntCounter,
    attempts_total: IntCounter,
    recognition_failures_total: IntCounter,
    timeouts_total: IntCounter,
    rejections_total: IntCounter,
    discarded_total: IntCounter,
    candidates_total: IntCounter,
    in_flight: IntGauge,

    // Check metrics
    registered_total: IntCounter,
    unregistered_total: IntCounter,

    // Session metrics
    camera_live: IntGauge,
    session_status: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter, MetricsError> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let gauge = |name: &str, help: &str| -> Result<IntGauge, MetricsError> {
            let g = IntGauge::new(name, help)?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        let ticks_total = counter("plate_scan_ticks_total", "Capture ticks fired")?;
        let skipped_busy_total = counter(
            "plate_scan_skipped_busy_total",
            "Ticks skipped because a recognition call was in flight",
        )?;
        let not_ready_total = counter(
            "plate_scan_not_ready_total",
            "Ticks skipped because the stream had no frame ready",
        )?;
        let attempts_total = counter(
            "plate_scan_attempts_total",
            "Frames submitted to the recognizer",
        )?;
        let recognition_failures_total = counter(
            "plate_scan_recognition_failures_total",
            "Recognition calls that failed in transport",
        )?;
        let timeouts_total = counter(
            "plate_scan_timeouts_total",
            "Recognition calls abandoned at the timeout",
        )?;
        let rejections_total = counter(
            "plate_scan_rejections_total",
            "Recognizer answers that failed plate validation",
        )?;
        let discarded_total = counter(
            "plate_scan_discarded_total",
            "Recognizer answers discarded after the session moved on",
        )?;
        let candidates_total = counter("plate_scan_candidates_total", "Accepted plate candidates")?;
        let in_flight = gauge(
            "plate_scan_in_flight",
            "Recognition call outstanding (1=yes, 0=no)",
        )?;

        let registered_total = counter(
            "plate_scan_registered_total",
            "Checks that matched a registered vehicle",
        )?;
        let unregistered_total = counter(
            "plate_scan_unregistered_total",
            "Checks that matched no registered vehicle",
        )?;

        let camera_live = gauge("plate_scan_camera_live", "Camera stream open (1=yes, 0=no)")?;
        let session_status = gauge(
            "plate_scan_session_status",
            "Session status (0=scanning, 1=pending, 2=checked)",
        )?;

        Ok(Self {
            registry,
            ticks_total,
            skipped_busy_total,
            not_ready_total,
            attempts_total,
            recognition_failures_total,
            timeouts_total,
            rejections_total,
            discarded_total,
            candidates_total,
            in_flight,
            registered_total,
            unregistered_total,
            camera_live,
            session_status,
        })
    }

    /// Updates all metrics from a snapshot of pipeline state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // Counters only move forward by the difference
        advance(&self.ticks_total, snapshot.ticks);
        advance(&self.skipped_busy_total, snapshot.skipped_busy);
        advance(&self.not_ready_total, snapshot.not_ready);
        advance(&self.attempts_total, snapshot.attempts);
        advance(&self.recognition_failures_total, snapshot.recognition_failures);
        advance(&self.timeouts_total, snapshot.timeouts);
        advance(&self.rejections_total, snapshot.rejections);
        advance(&self.discarded_total, snapshot.discarded);
        advance(&self.candidates_total, snapshot.candidates);
        advance(&self.registered_total, snapshot.registered);
        advance(&self.unregistered_total, snapshot.unregistered);

        self.in_flight.set(i64::from(snapshot.in_flight));
        self.camera_live.set(i64::from(snapshot.camera_live));
        if let Some(status) = snapshot.status {
            self.session_status.set(status.code());
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}
