//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes classification, dispatch, ingest backlog, and
//! lifecycle events into a bounded history plus a broadcast stream. Nothing in
//! the pipeline reads telemetry back; it is observability only.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::gesture::{Gesture, UiAction};
use crate::calibration::CalibrationReport;
use crate::dispatch::DispatchStatus;

pub mod events;

pub use events::{DiagnosticError, LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            if self.history_capacity > 0 {
                history.push_back(event.clone());
            }
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = lock(&self.history);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Rolling window of classifier call durations (microseconds).
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        (sum / count as f32, max, count)
    }
}

/// Last published backlog, used to debounce QueueBacklog events
#[derive(Default)]
struct BacklogGauge {
    last: Option<(usize, u64)>,
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
    latency_every: u64,
    latency_counter: AtomicU64,
    backlog: Mutex<BacklogGauge>,
}

impl TelemetryHub {
    /// Backlog changes smaller than this (with no new drops) are not published.
    const BACKLOG_STEP: usize = 16;

    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
            latency_every: latency_window.max(1) as u64,
            latency_counter: AtomicU64::new(0),
            backlog: Mutex::new(BacklogGauge::default()),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_classification(&self, raw_label: i32, smoothed_label: i32, gesture: Gesture) {
        self.collector.publish(MetricEvent::Classification {
            raw_label,
            smoothed_label,
            gesture,
        });
    }

    /// Track classifier latency; a summary is published once per window
    pub fn record_classify_latency(&self, micros: f32) {
        let (avg, max, count) = lock(&self.latency).observe(micros);
        let seen = self.latency_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % self.latency_every == 0 {
            self.collector.publish(MetricEvent::ClassifyLatency {
                avg_us: avg,
                max_us: max,
                sample_count: count,
            });
        }
    }

    pub fn record_dispatch(&self, action: UiAction, status: DispatchStatus) {
        self.collector
            .publish(MetricEvent::Dispatch { action, status });
    }

    pub fn record_queue_backlog(&self, backlog: usize, dropped: u64) {
        let mut gauge = lock(&self.backlog);
        let should_emit = match gauge.last {
            None => true,
            Some((last_backlog, last_dropped)) => {
                dropped != last_dropped || last_backlog.abs_diff(backlog) >= Self::BACKLOG_STEP
            }
        };

        if should_emit {
            gauge.last = Some((backlog, dropped));
            self.collector
                .publish(MetricEvent::QueueBacklog { backlog, dropped });
        }
    }

    pub fn record_calibration(&self, report: &CalibrationReport) {
        self.collector.publish(MetricEvent::Calibration {
            collected: report.collected,
            fitted: report.profile.is_some(),
            cancelled: report.cancelled,
        });
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.collector.publish(MetricEvent::Lifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
