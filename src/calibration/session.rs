// CalibrationSession - bounded rest-state collection on a worker thread
//
// The worker reads from an ingest tap with a per-read timeout so it can notice
// both its deadline and a cancel request. When the deadline passes it fits the
// calibrator on whatever it collected (zero samples is a no-op fit), reports the
// count, and drops the tap, which unregisters it from the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::profile::{CalibrationProfile, Calibrator};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::ingest::SampleTap;
use crate::telemetry;

/// Outcome of one calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Samples received through the tap
    pub collected: usize,
    /// Profile published by this session (None if empty or cancelled)
    pub profile: Option<CalibrationProfile>,
    pub duration_ms: u64,
    /// True if the session was cancelled before its deadline; nothing is fitted
    pub cancelled: bool,
}

/// Completion slot shared by a calibration worker and anyone waiting on it
///
/// The worker publishes exactly once, either its report or a failure if it
/// unwound without one.
#[derive(Default)]
pub struct SessionOutcome {
    result: Mutex<Option<Result<CalibrationReport, CalibrationError>>>,
    ready: Condvar,
}

impl SessionOutcome {
    fn publish(&self, result: Result<CalibrationReport, CalibrationError>) {
        let mut slot = match self.result.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(result);
        }
        self.ready.notify_all();
    }

    pub fn is_ready(&self) -> bool {
        match self.result.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// Block until the worker publishes
    pub fn wait(&self) -> Result<CalibrationReport, CalibrationError> {
        let slot = self
            .result
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        let slot = self
            .ready
            .wait_while(slot, |result| result.is_none())
            .map_err(|_| CalibrationError::StatePoisoned)?;
        slot.clone().unwrap_or(Err(CalibrationError::NotInProgress))
    }
}

/// Publishes a failure if the worker thread unwinds before reporting
struct PublishOnExit(Arc<SessionOutcome>);

impl Drop for PublishOnExit {
    fn drop(&mut self) {
        self.0.publish(Err(CalibrationError::WorkerFailed {
            reason: "calibration worker panicked".to_string(),
        }));
    }
}

/// Handle to a running calibration worker
pub struct CalibrationSession {
    cancel: Arc<AtomicBool>,
    outcome: Arc<SessionOutcome>,
    handle: JoinHandle<CalibrationReport>,
}

impl CalibrationSession {
    /// Spawn the worker
    ///
    /// # Arguments
    /// * `calibrator` - Receives the fitted profile
    /// * `tap` - Tap opened on the ingest queue; closed when the worker exits
    /// * `config` - Session duration and per-read timeout
    /// * `reports` - Broadcast channel for the final report
    pub fn spawn(
        calibrator: Arc<Calibrator>,
        tap: SampleTap,
        config: &CalibrationConfig,
        reports: broadcast::Sender<CalibrationReport>,
    ) -> Result<Self, CalibrationError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let outcome = Arc::new(SessionOutcome::default());
        let worker = CalibrationWorker {
            calibrator,
            tap,
            duration: config.duration(),
            poll_timeout: config.poll_timeout(),
            cancel: Arc::clone(&cancel),
        };
        let guard = PublishOnExit(Arc::clone(&outcome));

        let handle = thread::Builder::new()
            .name("calibration".to_string())
            .spawn(move || {
                let report = worker.run();
                let _ = reports.send(report.clone());
                guard.0.publish(Ok(report.clone()));
                report
            })
            .map_err(|err| CalibrationError::WorkerFailed {
                reason: err.to_string(),
            })?;

        Ok(Self {
            cancel,
            outcome,
            handle,
        })
    }

    /// True once the worker has produced its report
    pub fn is_finished(&self) -> bool {
        self.outcome.is_ready()
    }

    /// Shared completion slot; waiting on it does not need the session
    pub fn outcome(&self) -> Arc<SessionOutcome> {
        Arc::clone(&self.outcome)
    }

    /// Ask the worker to stop at its next poll; it will not fit
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait for the worker and return its report
    pub fn join(self) -> Result<CalibrationReport, CalibrationError> {
        self.handle
            .join()
            .map_err(|_| CalibrationError::WorkerFailed {
                reason: "calibration worker panicked".to_string(),
            })
    }
}

struct CalibrationWorker {
    calibrator: Arc<Calibrator>,
    tap: SampleTap,
    duration: Duration,
    poll_timeout: Duration,
    cancel: Arc<AtomicBool>,
}

impl CalibrationWorker {
    fn run(self) -> CalibrationReport {
        let started = Instant::now();
        let deadline = started + self.duration;
        let mut batch: Vec<Vec<i32>> = Vec::new();

        log::info!(
            "[Calibration] Collecting rest samples for {} ms",
            self.duration.as_millis()
        );

        let mut cancelled = false;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let timeout = self.poll_timeout.min(deadline - now);
            if let Some(sample) = self.tap.fetch(timeout) {
                batch.push(sample.channels().to_vec());
            }
        }
        // Unregister the tap before fitting.
        drop(self.tap);

        let collected = batch.len();
        let profile = if cancelled {
            log::info!(
                "[Calibration] Cancelled after {} samples, profile unchanged",
                collected
            );
            None
        } else {
            match self.calibrator.fit(&batch) {
                Ok(profile) => profile.map(|p| (*p).clone()),
                Err(err) => {
                    log_calibration_error(&err, "CalibrationWorker::run");
                    None
                }
            }
        };

        let report = CalibrationReport {
            collected,
            profile,
            duration_ms: started.elapsed().as_millis() as u64,
            cancelled,
        };
        log::info!(
            "[Calibration] Finished: collected={} fitted={}",
            report.collected,
            report.profile.is_some()
        );
        telemetry::hub().record_calibration(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestQueue, Sample};

    fn config(duration_ms: u64) -> CalibrationConfig {
        CalibrationConfig {
            duration_ms,
            poll_timeout_ms: 5,
        }
    }

    #[test]
    fn fits_on_tapped_samples() {
        let channels = IngestQueue::new(None);
        let calibrator = Arc::new(Calibrator::new());
        let (tx, mut rx) = broadcast::channel(4);

        let session = CalibrationSession::spawn(
            Arc::clone(&calibrator),
            channels.taps.open(),
            &config(100),
            tx,
        )
        .unwrap();
        for v in [2, 4, 6] {
            channels.sender.push(Sample::new(0, vec![v, 1]));
        }

        let report = session.join().unwrap();
        assert_eq!(report.collected, 3);
        assert!(!report.cancelled);
        let profile = report.profile.clone().unwrap();
        assert_eq!(profile.channels()[0].mean, 4.0);
        assert_eq!(profile.channels()[0].std, 2.0);
        assert!(calibrator.is_calibrated());

        assert_eq!(rx.try_recv().unwrap(), report);
        assert!(!channels.taps.is_open());
    }

    #[test]
    fn empty_session_leaves_identity() {
        let channels = IngestQueue::new(None);
        let calibrator = Arc::new(Calibrator::new());
        let (tx, _rx) = broadcast::channel(4);

        let session = CalibrationSession::spawn(
            Arc::clone(&calibrator),
            channels.taps.open(),
            &config(20),
            tx,
        )
        .unwrap();
        let report = session.join().unwrap();

        assert_eq!(report.collected, 0);
        assert!(report.profile.is_none());
        assert_eq!(calibrator.transform(&[5, -5]), vec![5.0, -5.0]);
    }

    #[test]
    fn cancel_skips_fit() {
        let channels = IngestQueue::new(None);
        let calibrator = Arc::new(Calibrator::new());
        let (tx, _rx) = broadcast::channel(4);

        let session = CalibrationSession::spawn(
            Arc::clone(&calibrator),
            channels.taps.open(),
            &config(60_000),
            tx,
        )
        .unwrap();
        channels.sender.push(Sample::new(0, vec![1, 2]));
        session.cancel();

        let report = session.join().unwrap();
        assert!(report.cancelled);
        assert!(report.profile.is_none());
        assert!(!calibrator.is_calibrated());
    }

    #[test]
    fn reports_finished() {
        let channels = IngestQueue::new(None);
        let (tx, _rx) = broadcast::channel(4);
        let session = CalibrationSession::spawn(
            Arc::new(Calibrator::new()),
            channels.taps.open(),
            &config(10),
            tx,
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !session.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(session.is_finished());
        session.join().unwrap();
    }

    #[test]
    fn outcome_wait_sees_cancelled_report() {
        let channels = IngestQueue::new(None);
        let (tx, _rx) = broadcast::channel(4);
        let session = CalibrationSession::spawn(
            Arc::new(Calibrator::new()),
            channels.taps.open(),
            &config(60_000),
            tx,
        )
        .unwrap();

        let outcome = session.outcome();
        let waiter = thread::spawn(move || outcome.wait());
        thread::sleep(Duration::from_millis(20));
        assert!(!session.is_finished());

        session.cancel();
        let joined = session.join().unwrap();
        let waited = waiter.join().unwrap().unwrap();
        assert!(waited.cancelled);
        assert_eq!(waited, joined);
    }
}
