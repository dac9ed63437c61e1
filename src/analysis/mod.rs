// Analysis module - windowing, classification, and smoothing on the consumer thread
//
// This module owns the recognition cycle. Every tick the worker drains the ingest
// queue and feeds each sample, in arrival order, through:
//
//   WindowBuffer -> Classifier -> Smoother -> Gesture -> ActionDispatcher
//
// Architecture:
// - RecognitionLoop: all mutable per-cycle state, touched only by the worker
// - LoopShared: state other threads read (calibrator, capture slot, stats, events)
// - spawn_recognition_thread: periodic tick loop that hands the loop back on exit
//   so the pipeline can be restarted
//
// Samples also pass through the Calibrator when a trial capture is active. The
// window itself only sees the fixed pre-window transform.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::calibration::Calibrator;
use crate::capture::TrialCapture;
use crate::config::AppConfig;
use crate::dispatch::{ActionDispatcher, DispatchStatus};
use crate::ingest::{Sample, SampleReceiver};
use crate::telemetry::{self, DiagnosticError};

pub mod classifier;
pub mod gesture;
pub mod smoother;
pub mod stats;
pub mod window;

use classifier::Classifier;
use gesture::{Gesture, UiAction};
use smoother::Smoother;
use stats::PipelineStats;
use window::{Preprocess, WindowBuffer};

/// One completed classify -> smooth -> dispatch cycle
///
/// Broadcast to subscribers of the pipeline for display and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Timestamp of the newest sample in the window
    pub timestamp_ns: u64,
    /// Label straight from the classifier
    pub raw_label: i32,
    /// Majority label over the smoothing history
    pub smoothed_label: i32,
    pub gesture: Gesture,
    pub action: Option<UiAction>,
    pub dispatch: DispatchStatus,
}

/// State shared between the recognition worker and the pipeline handle
#[derive(Clone)]
pub struct LoopShared {
    pub calibrator: Arc<Calibrator>,
    pub capture: Arc<Mutex<Option<TrialCapture>>>,
    pub stats: Arc<PipelineStats>,
    pub events: broadcast::Sender<RecognitionEvent>,
}

/// Single-consumer recognition state machine
///
/// Filling (window not full) -> Ready -> classify + smooth + maybe dispatch on
/// every further sample. There is no terminal state; when samples stop, the
/// window simply keeps its last contents.
pub struct RecognitionLoop {
    window: WindowBuffer,
    preprocess: Preprocess,
    smoother: Smoother,
    classifier: Arc<dyn Classifier>,
    dispatcher: ActionDispatcher,
    shared: LoopShared,
    scratch: Vec<f32>,
}

impl RecognitionLoop {
    pub fn new(
        config: &AppConfig,
        classifier: Arc<dyn Classifier>,
        dispatcher: ActionDispatcher,
        shared: LoopShared,
    ) -> Self {
        Self {
            window: WindowBuffer::new(config.window.window_size, config.window.channel_count),
            preprocess: config.window.preprocess,
            smoother: Smoother::new(config.smoothing.history_len),
            classifier,
            dispatcher,
            shared,
            scratch: Vec::with_capacity(config.window.input_len()),
        }
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    /// Run one sample through the cycle
    ///
    /// Returns the event when the sample completed a classification cycle,
    /// `None` while the window is still filling or if the sample was rejected.
    pub fn process_sample(&mut self, sample: &Sample) -> Option<RecognitionEvent> {
        self.shared.stats.record_sample();

        let preprocess = self.preprocess;
        if let Err(err) = self
            .window
            .push(sample.channels(), |v| preprocess.apply(v))
        {
            self.shared.stats.record_rejected_sample();
            tracing::warn!("[RecognitionWorker] Skipping sample: {}", err);
            telemetry::hub().record_error(DiagnosticError::SampleShape, err.to_string());
            return None;
        }
        // Only samples the window accepted reach an active trial.
        self.capture_frame(sample);

        if !self.window.snapshot_into(&mut self.scratch) {
            return None;
        }

        let started = Instant::now();
        let raw_label = self.classifier.predict(&self.scratch);
        telemetry::hub().record_classify_latency(started.elapsed().as_micros() as f32);

        let smoothed_label = self.smoother.observe(raw_label);
        let gesture = Gesture::from_label(smoothed_label);
        let dispatch = self.dispatcher.dispatch(gesture);

        let stats = &self.shared.stats;
        stats.record_cycle();
        match dispatch {
            DispatchStatus::Dispatched => stats.record_dispatched(),
            DispatchStatus::CooledDown => stats.record_cooldown_drop(),
            DispatchStatus::Failed => stats.record_dispatch_failure(),
            DispatchStatus::NoAction => {}
        }

        let event = RecognitionEvent {
            timestamp_ns: sample.timestamp_ns(),
            raw_label,
            smoothed_label,
            gesture,
            action: gesture.action(),
            dispatch,
        };
        telemetry::hub().record_classification(raw_label, smoothed_label, gesture);
        let _ = self.shared.events.send(event.clone());
        Some(event)
    }

    fn capture_frame(&self, sample: &Sample) {
        let mut slot = match self.shared.capture.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(capture) = slot.as_mut() {
            let values = self.shared.calibrator.transform(sample.channels());
            capture.push(sample.timestamp_ns(), values);
        }
    }

    /// Drain the queue once and process everything in arrival order
    ///
    /// Returns the number of completed classification cycles.
    pub fn tick(&mut self, receiver: &SampleReceiver) -> usize {
        telemetry::hub().record_queue_backlog(receiver.backlog(), receiver.dropped());
        receiver
            .drain_all()
            .iter()
            .filter_map(|sample| self.process_sample(sample))
            .count()
    }
}

/// Spawn the periodic consumer thread
///
/// The thread ticks every `period` while `alive` is set, runs one final drain
/// after it clears, and returns the loop and receiver so they can be reused.
pub fn spawn_recognition_thread(
    mut recognition: RecognitionLoop,
    receiver: SampleReceiver,
    period: Duration,
    alive: Arc<AtomicBool>,
) -> io::Result<JoinHandle<(RecognitionLoop, SampleReceiver)>> {
    thread::Builder::new()
        .name("recognition".to_string())
        .spawn(move || {
            tracing::info!(
                "[RecognitionWorker] Started: window={}x{}, tick={}ms",
                recognition.window.window_size(),
                recognition.window.channel_count(),
                period.as_millis()
            );

            while alive.load(Ordering::SeqCst) {
                recognition.tick(&receiver);
                thread::sleep(period);
            }
            // Samples pushed before the producer was joined are still processed.
            recognition.tick(&receiver);

            tracing::info!(
                "[RecognitionWorker] Stopped after {} cycles",
                recognition.shared.stats.snapshot().cycles
            );
            (recognition, receiver)
        })
}
