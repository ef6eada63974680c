//! Scripted recognizer for tests and the offline demo.
//!
//! Answers are replayed in order; once the script runs out every call
//! gets the fallback answer. The recognizer also records how many calls
//! were ever in flight at once.

use super::{Recognition, RecognitionError, Recognizer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer.
#[derive(Debug)]
pub struct ScriptStep {
    /// Overrides the recognizer's default latency for this call.
    pub latency: Option<Duration>,
    pub outcome: Result<Recognition, RecognitionError>,
}

/// Recognizer that replays a fixed script.
#[derive(Debug)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<ScriptStep>>,
    fallback: Recognition,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRecognizer {
    /// Creates an empty script that answers "not recognized".
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Recognition::not_recognized(),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets the latency applied to every call without its own.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the answer used once the script is exhausted.
    pub fn with_fallback(mut self, fallback: Recognition) -> Self {
        self.fallback = fallback;
        self
    }

    /// Queues a successful answer.
    pub fn push_reply(&self, recognition: Recognition) -> &Self {
        self.push(ScriptStep {
            latency: None,
            outcome: Ok(recognition),
        })
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, error: RecognitionError) -> &Self {
        self.push(ScriptStep {
            latency: None,
            outcome: Err(error),
        })
    }

    /// Queues an arbitrary step.
    pub fn push(&self, step: ScriptStep) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
        self
    }

    /// Total calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls currently awaiting their answer.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever in flight together.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptStep> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

/// Decrements the in-flight count even when the call is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Recognition, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        tracing::trace!(bytes = image.len(), "ScriptedRecognizer call");

        let step = self.next_step();
        let latency = step
            .as_ref()
            .and_then(|s| s.latency)
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match step {
            Some(step) => step.outcome,
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_then_fallback() {
        let recognizer = ScriptedRecognizer::new();
        recognizer
            .push_reply(Recognition::new("12가3456", None))
            .push_failure(RecognitionError::Status(502));

        let first = recognizer.recognize(b"png").await.unwrap();
        assert_eq!(first.text.as_deref(), Some("12가3456"));
        assert!(matches!(
            recognizer.recognize(b"png").await,
            Err(RecognitionError::Status(502))
        ));
        assert_eq!(recognizer.recognize(b"png").await.unwrap(), Recognition::not_recognized());
        assert_eq!(recognizer.calls(), 3);
        assert_eq!(recognizer.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_leaves_flight() {
        let recognizer = ScriptedRecognizer::new().with_latency(Duration::from_secs(10));
        let result =
            tokio::time::timeout(Duration::from_secs(1), recognizer.recognize(b"png")).await;

        assert!(result.is_err());
        assert_eq!(recognizer.in_flight(), 0);
        assert_eq!(recognizer.peak_in_flight(), 1);
    }
}
