//! Pipeline: lifecycle owner of the recognition stack.
//!
//! Every collaborator (config, classifier, sample source, UI mailbox, clock) is
//! injected through the constructor; there is no process-wide state besides
//! telemetry. All methods take `&self` so the handle can be shared across
//! threads behind an `Arc`.
//!
//! Threads owned by a running pipeline:
//! - the source's producer thread (started/stopped through `SampleSource`)
//! - the recognition worker (one periodic consumer)
//! - at most one calibration worker
//!
//! `stop()` signals and joins all of them before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tokio::sync::broadcast;

use crate::analysis::classifier::{check_shape, Classifier};
use crate::analysis::stats::{PipelineStats, StatsSnapshot};
use crate::analysis::{spawn_recognition_thread, LoopShared, RecognitionEvent, RecognitionLoop};
use crate::calibration::{CalibrationReport, CalibrationSession, Calibrator};
use crate::capture::TrialCapture;
use crate::config::AppConfig;
use crate::dispatch::{ActionDispatcher, MailboxSender};
use crate::engine::time::{SystemTimeSource, TimeSource};
use crate::error::{log_calibration_error, log_pipeline_error, CalibrationError, PipelineError};
use crate::ingest::{
    now_timestamp_ns, IngestQueue, SampleReceiver, SampleSender, SampleSource, TapHandle,
};
use crate::telemetry::{self, LifecyclePhase};

type WorkerHandle = JoinHandle<(RecognitionLoop, SampleReceiver)>;

/// Running recognition worker and its stop flag
struct Worker {
    alive: Arc<AtomicBool>,
    handle: WorkerHandle,
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    component: &str,
) -> Result<MutexGuard<'a, T>, PipelineError> {
    mutex.lock().map_err(|_| PipelineError::LockPoisoned {
        component: component.to_string(),
    })
}

/// Real-time gesture recognition pipeline
pub struct Pipeline {
    config: AppConfig,
    shared: LoopShared,
    calibration_tx: broadcast::Sender<CalibrationReport>,
    sender: SampleSender,
    taps: TapHandle,
    source: Mutex<Box<dyn SampleSource>>,
    /// Recognition loop while the worker is not running
    idle: Mutex<Option<(RecognitionLoop, SampleReceiver)>>,
    worker: Mutex<Option<Worker>>,
    calibration: Mutex<Option<CalibrationSession>>,
    running: AtomicBool,
}

impl Pipeline {
    /// Build a pipeline using the system monotonic clock
    ///
    /// Fails with `InvalidConfig` or `ShapeMismatch`; both are fatal and
    /// detected here once rather than per sample.
    pub fn new(
        config: AppConfig,
        classifier: Arc<dyn Classifier>,
        source: Box<dyn SampleSource>,
        mailbox: MailboxSender,
    ) -> Result<Self, PipelineError> {
        Self::with_time_source(config, classifier, source, mailbox, Arc::new(SystemTimeSource))
    }

    /// Build a pipeline with an explicit clock for the cooldown gate
    pub fn with_time_source(
        config: AppConfig,
        classifier: Arc<dyn Classifier>,
        source: Box<dyn SampleSource>,
        mailbox: MailboxSender,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        check_shape(
            classifier.as_ref(),
            config.window.window_size,
            config.window.channel_count,
        )?;

        let channels = IngestQueue::new(config.ingest.max_backlog);
        let (events_tx, _) = broadcast::channel(256);
        let (calibration_tx, _) = broadcast::channel(8);
        let shared = LoopShared {
            calibrator: Arc::new(Calibrator::new()),
            capture: Arc::new(Mutex::new(None)),
            stats: Arc::new(PipelineStats::default()),
            events: events_tx,
        };

        let dispatcher = ActionDispatcher::new(mailbox, config.dispatch.cooldown(), clock);
        let recognition = RecognitionLoop::new(&config, classifier, dispatcher, shared.clone());

        log::info!(
            "[Pipeline] Created: window={}x{}, history={}, cooldown={}ms, source={}",
            config.window.window_size,
            config.window.channel_count,
            config.smoothing.history_len,
            config.dispatch.cooldown_ms,
            source.name()
        );

        Ok(Self {
            config,
            shared,
            calibration_tx,
            sender: channels.sender,
            taps: channels.taps,
            source: Mutex::new(source),
            idle: Mutex::new(Some((recognition, channels.receiver))),
            worker: Mutex::new(None),
            calibration: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Start the sample source and the recognition worker
    ///
    /// A source that fails to start is logged and the pipeline keeps running
    /// without samples.
    pub fn start(&self) -> Result<(), PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }

        let result = self.start_inner();
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    fn start_inner(&self) -> Result<(), PipelineError> {
        let mut worker = lock(&self.worker, "worker")?;
        let (recognition, receiver) =
            lock(&self.idle, "recognition loop")?
                .take()
                .ok_or_else(|| PipelineError::WorkerFailed {
                    reason: "recognition loop was lost by a previous worker".to_string(),
                })?;

        {
            let mut source = match self.source.lock() {
                Ok(source) => source,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = source.start(self.sender.clone()) {
                log_pipeline_error(&err, "Pipeline::start");
                tracing::warn!(
                    "[Pipeline] Source '{}' unavailable, running without samples",
                    source.name()
                );
                telemetry::hub().record_lifecycle(LifecyclePhase::SourceUnavailable);
            }
        }

        let alive = Arc::new(AtomicBool::new(true));
        let handle = spawn_recognition_thread(
            recognition,
            receiver,
            self.config.ingest.tick(),
            Arc::clone(&alive),
        )
        .map_err(|err| {
            if let Ok(mut source) = self.source.lock() {
                source.stop();
            }
            PipelineError::from(err)
        })?;
        *worker = Some(Worker { alive, handle });

        log::info!("[Pipeline] Started");
        telemetry::hub().record_lifecycle(LifecyclePhase::PipelineStarted);
        Ok(())
    }

    /// Stop and join the source, any calibration worker, and the recognition worker
    pub fn stop(&self) -> Result<(), PipelineError> {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::NotRunning);
        }

        lock(&self.source, "source")?.stop();

        let session = lock(&self.calibration, "calibration")?.take();
        if let Some(session) = session {
            session.cancel();
            if let Err(err) = session.join() {
                log_calibration_error(&err, "Pipeline::stop");
            }
        }

        let worker = lock(&self.worker, "worker")?.take();
        if let Some(Worker { alive, handle }) = worker {
            alive.store(false, Ordering::SeqCst);
            let parts = handle.join().map_err(|_| PipelineError::WorkerFailed {
                reason: "recognition worker panicked".to_string(),
            })?;
            *lock(&self.idle, "recognition loop")? = Some(parts);
        }

        log::info!("[Pipeline] Stopped");
        telemetry::hub().record_lifecycle(LifecyclePhase::PipelineStopped);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin a rest-state calibration session
    ///
    /// Rejected while a capture is active or another session is running.
    pub fn start_calibration(&self) -> Result<(), CalibrationError> {
        // Lock order: calibration, then capture.
        let mut calibration = self
            .calibration
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        if let Some(session) = calibration.as_ref() {
            if !session.is_finished() {
                return Err(CalibrationError::AlreadyInProgress);
            }
        }
        {
            let capture = self
                .shared
                .capture
                .lock()
                .map_err(|_| CalibrationError::StatePoisoned)?;
            if capture.is_some() {
                return Err(CalibrationError::CaptureActive);
            }
        }

        // A finished but unclaimed session is reaped here.
        if let Some(previous) = calibration.take() {
            if let Err(err) = previous.join() {
                log_calibration_error(&err, "Pipeline::start_calibration");
            }
        }

        let session = CalibrationSession::spawn(
            Arc::clone(&self.shared.calibrator),
            self.taps.open(),
            &self.config.calibration,
            self.calibration_tx.clone(),
        )?;
        *calibration = Some(session);

        log::info!(
            "[Pipeline] Calibration started ({} ms)",
            self.config.calibration.duration_ms
        );
        telemetry::hub().record_lifecycle(LifecyclePhase::CalibrationStarted);
        Ok(())
    }

    /// True while a calibration worker is collecting
    pub fn calibration_active(&self) -> bool {
        match self.calibration.lock() {
            Ok(calibration) => calibration
                .as_ref()
                .map(|session| !session.is_finished())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Block until the current calibration session finishes
    ///
    /// The session stays registered while waiting, so exclusion with capture
    /// and the shutdown join still apply. A `stop()` during the wait yields
    /// the cancelled report.
    pub fn wait_calibration(&self) -> Result<CalibrationReport, CalibrationError> {
        let outcome = self
            .calibration
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)?
            .as_ref()
            .map(CalibrationSession::outcome)
            .ok_or(CalibrationError::NotInProgress)?;

        let result = outcome.wait();

        // Reap the session unless stop() or a newer session already replaced it.
        let finished = {
            let mut calibration = self
                .calibration
                .lock()
                .map_err(|_| CalibrationError::StatePoisoned)?;
            match calibration.as_ref() {
                Some(session) if Arc::ptr_eq(&session.outcome(), &outcome) => calibration.take(),
                _ => None,
            }
        };
        if let Some(session) = finished {
            if let Err(err) = session.join() {
                log_calibration_error(&err, "Pipeline::wait_calibration");
            }
        }
        result
    }

    /// Begin recording calibrated frames for a labelled trial
    ///
    /// Returns the trial id (generated when `trial_id` is empty).
    pub fn start_capture(&self, label: &str, trial_id: &str) -> Result<String, PipelineError> {
        if label.trim().is_empty() {
            return Err(PipelineError::CaptureRejected {
                reason: "label must not be empty".to_string(),
            });
        }

        let calibration = lock(&self.calibration, "calibration")?;
        if calibration
            .as_ref()
            .map(|session| !session.is_finished())
            .unwrap_or(false)
        {
            return Err(PipelineError::CaptureRejected {
                reason: "calibration in progress".to_string(),
            });
        }

        let mut capture = lock(&self.shared.capture, "capture")?;
        if capture.is_some() {
            return Err(PipelineError::CaptureRejected {
                reason: "a capture is already active".to_string(),
            });
        }

        let trial = TrialCapture::new(label, trial_id, now_timestamp_ns());
        let id = trial.trial_id.clone();
        *capture = Some(trial);
        drop(capture);
        drop(calibration);

        log::info!("[Pipeline] Capture started: label={} trial={}", label, id);
        telemetry::hub().record_lifecycle(LifecyclePhase::CaptureStarted);
        Ok(id)
    }

    /// Finish the active capture and hand back its frames
    pub fn stop_capture(&self) -> Result<TrialCapture, PipelineError> {
        let capture = lock(&self.shared.capture, "capture")?
            .take()
            .ok_or(PipelineError::NoActiveCapture)?;

        log::info!(
            "[Pipeline] Capture stopped: trial={} frames={}",
            capture.trial_id,
            capture.len()
        );
        telemetry::hub().record_lifecycle(LifecyclePhase::CaptureStopped);
        Ok(capture)
    }

    /// Discard the active capture, if any; returns whether one was discarded
    pub fn cancel_capture(&self) -> bool {
        match self.shared.capture.lock() {
            Ok(mut capture) => capture.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RecognitionEvent> {
        self.shared.events.subscribe()
    }

    pub fn subscribe_calibration(&self) -> broadcast::Receiver<CalibrationReport> {
        self.calibration_tx.subscribe()
    }

    pub fn calibrator(&self) -> Arc<Calibrator> {
        Arc::clone(&self.shared.calibrator)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                log_pipeline_error(&err, "Pipeline::drop");
            }
        }
    }
}

#[cfg(test)]
mod tests;
