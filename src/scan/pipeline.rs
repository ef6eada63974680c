//! Top-level scan pipeline.
//!
//! Wires the camera, the capture scheduler, the scan session and the
//! registry collaborator together for one scan screen.

use super::scheduler::{CaptureScheduler, SchedulerStats, TickOutcome};
use super::session::{ScanPolicy, ScanSession, ScanStatus, Verdict};
use crate::capture::{CameraBackend, CameraError, CameraManager, ScanConfig};
use crate::recognition::Recognizer;
use crate::registry::{RegistryRecord, VehicleRegistry};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Number of checks per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictCounts {
    pub registered: u64,
    pub unregistered: u64,
}

/// Camera, scheduler, session and registry for one scan screen.
pub struct ScanPipeline<B, R, G> {
    camera: CameraManager<B>,
    scheduler: CaptureScheduler<R>,
    session: Mutex<ScanSession>,
    registry: G,
    registered: AtomicU64,
    unregistered: AtomicU64,
}

impl<B, R, G> ScanPipeline<B, R, G>
where
    B: CameraBackend,
    R: Recognizer,
    G: VehicleRegistry,
{
    pub fn new(camera: CameraManager<B>, recognizer: R, registry: G, config: &ScanConfig) -> Self {
        Self {
            camera,
            scheduler: CaptureScheduler::new(recognizer, config),
            session: Mutex::new(ScanSession::new(ScanPolicy::from(config))),
            registry,
            registered: AtomicU64::new(0),
            unregistered: AtomicU64::new(0),
        }
    }

    pub fn camera(&self) -> &CameraManager<B> {
        &self.camera
    }

    pub fn scheduler(&self) -> &CaptureScheduler<R> {
        &self.scheduler
    }

    pub fn registry(&self) -> &G {
        &self.registry
    }

    /// Locks the session for inspection.
    pub async fn session(&self) -> MutexGuard<'_, ScanSession> {
        self.session.lock().await
    }

    pub async fn status(&self) -> ScanStatus {
        self.session.lock().await.status()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Check outcomes so far.
    pub fn verdicts(&self) -> VerdictCounts {
        VerdictCounts {
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
        }
    }

    /// Enumerates devices and starts the camera.
    ///
    /// A device error leaves the session idle; callers render
    /// [`CameraError::notice`] and may call [`Self::retry_camera`].
    pub fn activate(&mut self) -> Result<(), CameraError> {
        self.camera.enumerate();
        self.camera.activate()
    }

    /// Starts the camera again if it is not live.
    pub fn retry_camera(&mut self) -> Result<(), CameraError> {
        if self.camera.is_live() {
            return Ok(());
        }
        info!("Retrying camera start");
        self.camera.activate()
    }

    /// Cycles to the next camera and returns its id.
    pub fn switch_camera(&mut self) -> Result<Option<String>, CameraError> {
        self.camera.switch_next().map(|id| id.map(str::to_owned))
    }

    /// Stops capture and releases the camera.
    pub fn deactivate(&mut self) {
        self.session.get_mut().disarm();
        self.camera.stop();
        info!("Scan pipeline deactivated");
    }

    /// Runs one capture attempt.
    pub async fn tick(&self) -> TickOutcome {
        self.scheduler.tick(&self.camera, &self.session).await
    }

    /// Ticks on the scheduler interval until a candidate is accepted.
    ///
    /// Returns `None` on shutdown or when capture is disarmed without a
    /// candidate. Ticks that fire while an attempt is in flight are
    /// skipped by the scheduler.
    pub async fn run_until_candidate(&self, shutdown: &mut watch::Receiver<bool>) -> Option<String> {
        if *shutdown.borrow() {
            return None;
        }

        let mut ticker = tokio::time::interval(self.scheduler.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut attempts: FuturesUnordered<LocalBoxFuture<'_, TickOutcome>> = FuturesUnordered::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    attempts.push(self.tick().boxed_local());
                }
                Some(outcome) = attempts.next(), if !attempts.is_empty() => {
                    match outcome {
                        TickOutcome::Candidate(text) => return Some(text),
                        TickOutcome::Disarmed => {
                            let session = self.session.lock().await;
                            return session.candidate().map(|c| c.text().to_string());
                        }
                        other => debug!(outcome = ?other, "Capture tick finished"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Capture loop shutting down");
                        return None;
                    }
                }
            }
        }
    }

    /// Replaces the pending candidate's text with a user correction.
    pub async fn edit_candidate(&self, text: impl Into<String>) -> bool {
        self.session.lock().await.edit_text(text)
    }

    /// Checks the candidate against a fresh registry snapshot.
    ///
    /// Returns `None` if a rescan happened while the snapshot was loading.
    pub async fn confirm(&self) -> Option<Verdict> {
        let epoch = self.session.lock().await.epoch();
        let snapshot = self.load_snapshot().await;

        let mut session = self.session.lock().await;
        if session.epoch() != epoch {
            debug!("Rescan during confirmation, check dropped");
            return None;
        }
        let verdict = session.confirm(&snapshot).clone();
        self.count(&verdict);
        Some(verdict)
    }

    /// Re-runs the match for a checked session against a fresh snapshot.
    pub async fn refresh(&self) -> Option<Verdict> {
        let epoch = {
            let session = self.session.lock().await;
            if session.status() != ScanStatus::Checked {
                return None;
            }
            session.epoch()
        };
        let snapshot = self.load_snapshot().await;

        let mut session = self.session.lock().await;
        if session.epoch() != epoch {
            return None;
        }
        session.refresh(&snapshot).cloned()
    }

    /// Returns to scanning and makes sure the camera is live.
    pub fn rescan(&mut self) -> Result<(), CameraError> {
        self.session.get_mut().rescan();
        self.retry_camera()
    }

    async fn load_snapshot(&self) -> Vec<RegistryRecord> {
        match self.registry.list().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Registry unavailable, checking against empty snapshot");
                Vec::new()
            }
        }
    }

    fn count(&self, verdict: &Verdict) {
        let counter = if verdict.is_registered() {
            &self.registered
        } else {
            &self.unregistered
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
