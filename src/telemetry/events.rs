//! Core telemetry event types describing pipeline diagnostics exposed to the
//! CLI and any other observer.

use serde::{Deserialize, Serialize};

use crate::analysis::gesture::{Gesture, UiAction};
use crate::dispatch::DispatchStatus;

/// High-level lifecycle stages reported by the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    PipelineStarted,
    SourceUnavailable,
    PipelineStopped,
    CalibrationStarted,
    CaptureStarted,
    CaptureStopped,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    SampleShape,
    CalibrationFailed,
    LockPoisoned,
    Unknown,
}

/// Rich metric events covering classification, dispatch, backlog, and lifecycle details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Classification {
        raw_label: i32,
        smoothed_label: i32,
        gesture: Gesture,
    },
    ClassifyLatency {
        avg_us: f32,
        max_us: f32,
        sample_count: usize,
    },
    Dispatch {
        action: UiAction,
        status: DispatchStatus,
    },
    QueueBacklog {
        backlog: usize,
        dropped: u64,
    },
    Calibration {
        collected: usize,
        fitted: bool,
        cancelled: bool,
    },
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
