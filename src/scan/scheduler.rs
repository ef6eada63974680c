//! Capture scheduler.
//!
//! Every tick grabs one frame and sends it to the recognizer. A single
//! busy flag makes attempts single-flight: a tick that fires while an
//! attempt is outstanding is skipped, not queued, so results can never
//! arrive out of order. Each attempt is bounded by a timeout; failures
//! are logged and the next tick is the retry.

use super::session::{Applied, ScanSession};
use crate::capture::{FrameSampler, ScanConfig};
use crate::plate::Rejection;
use crate::recognition::{RecognitionError, Recognizer};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not scanning or capture was disarmed.
    Disarmed,
    /// Another attempt is in flight; this tick was skipped.
    Busy,
    /// The stream had no frame ready.
    NotReady,
    /// Encoding, transport or timeout failure.
    Failed(String),
    /// The recognizer answered but the text was not a valid plate.
    Rejected(Rejection),
    /// The answer arrived after the session moved on.
    Discarded,
    /// A candidate was accepted; capture is now disarmed.
    Candidate(String),
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub skipped_busy: u64,
    pub not_ready: u64,
    pub attempts: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejections: u64,
    pub discarded: u64,
    pub candidates: u64,
    pub in_flight: bool,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped_busy: AtomicU64,
    not_ready: AtomicU64,
    attempts: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    rejections: AtomicU64,
    discarded: AtomicU64,
    candidates: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Holds the busy flag for the lifetime of one attempt.
///
/// Dropping the guard releases the flag, including when the attempt's
/// future is cancelled.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives periodic recognition attempts for a scan session.
pub struct CaptureScheduler<R> {
    recognizer: R,
    interval: Duration,
    timeout: Duration,
    busy: AtomicBool,
    counters: Counters,
}

impl<R: Recognizer> CaptureScheduler<R> {
    pub fn new(recognizer: R, config: &ScanConfig) -> Self {
        Self {
            recognizer,
            interval: config.interval(),
            timeout: config.timeout(),
            busy: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Returns the recognizer.
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Period between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bound on one recognition round trip.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True while an attempt is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> SchedulerStats {
        let c = &self.counters;
        let load = |v: &AtomicU64| v.load(Ordering::Relaxed);
        SchedulerStats {
            ticks: load(&c.ticks),
            skipped_busy: load(&c.skipped_busy),
            not_ready: load(&c.not_ready),
            attempts: load(&c.attempts),
            failures: load(&c.failures),
            timeouts: load(&c.timeouts),
            rejections: load(&c.rejections),
            discarded: load(&c.discarded),
            candidates: load(&c.candidates),
            in_flight: self.is_busy(),
        }
    }

    /// Runs one capture attempt if the session is armed and nothing is
    /// in flight.
    pub async fn tick<S>(&self, sampler: &S, session: &Mutex<ScanSession>) -> TickOutcome
    where
        S: FrameSampler + ?Sized,
    {
        bump(&self.counters.ticks);

        let epoch = {
            let session = session.lock().await;
            if !session.is_armed() {
                return TickOutcome::Disarmed;
            }
            session.epoch()
        };

        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            bump(&self.counters.skipped_busy);
            debug!("Capture tick skipped, attempt in flight");
            return TickOutcome::Busy;
        };

        let Some(frame) = sampler.sample() else {
            bump(&self.counters.not_ready);
            trace!("Capture tick skipped, stream not ready");
            return TickOutcome::NotReady;
        };

        let payload = match frame.encode_png() {
            Ok(payload) => payload,
            Err(e) => {
                bump(&self.counters.failures);
                warn!(error = %e, "Failed to encode capture frame");
                return TickOutcome::Failed(e.to_string());
            }
        };

        bump(&self.counters.attempts);
        trace!(frame = frame.sequence(), bytes = payload.len(), "Submitting frame");

        let recognition =
            match tokio::time::timeout(self.timeout, self.recognizer.recognize(&payload)).await {
                Ok(Ok(recognition)) => recognition,
                Ok(Err(e)) => {
                    bump(&self.counters.failures);
                    warn!(error = %e, "Recognition failed");
                    return TickOutcome::Failed(e.to_string());
                }
                Err(_) => {
                    bump(&self.counters.timeouts);
                    let e = RecognitionError::Timeout(self.timeout);
                    warn!(error = %e, "Recognition abandoned");
                    return TickOutcome::Failed(e.to_string());
                }
            };

        let applied = session
            .lock()
            .await
            .apply_recognition(epoch, &frame, &recognition);

        match applied {
            Applied::Discarded => {
                bump(&self.counters.discarded);
                TickOutcome::Discarded
            }
            Applied::Rejected(rejection) => {
                bump(&self.counters.rejections);
                trace!(reason = %rejection, "Recognition rejected");
                TickOutcome::Rejected(rejection)
            }
            Applied::Accepted(text) => {
                bump(&self.counters.candidates);
                TickOutcome::Candidate(text)
            }
        }
    }
}
