// Pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 1001-1011
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Pipeline is already running
    pub const ALREADY_RUNNING: i32 = 1001;

    /// Pipeline is not running
    pub const NOT_RUNNING: i32 = 1002;

    /// Classifier input length does not match window_size x channel_count
    pub const SHAPE_MISMATCH: i32 = 1003;

    /// Configuration value rejected at startup
    pub const INVALID_CONFIG: i32 = 1004;

    /// Sample source could not be started
    pub const SOURCE_UNAVAILABLE: i32 = 1005;

    /// Sample carried an unexpected number of channels
    pub const SAMPLE_SHAPE: i32 = 1006;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1007;

    /// Worker thread could not be spawned or panicked
    pub const WORKER_FAILED: i32 = 1008;

    /// Trial capture could not be started
    pub const CAPTURE_REJECTED: i32 = 1009;

    /// No trial capture is active
    pub const NO_ACTIVE_CAPTURE: i32 = 1010;

    /// Classifier model file could not be loaded
    pub const INVALID_MODEL: i32 = 1011;
}

/// Log a pipeline error with structured context
///
/// Writes error_code, component, and message fields at error level.
/// The logging is non-blocking and will not panic on failure.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=Pipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Pipeline-related errors
///
/// These errors cover startup validation, lifecycle management, sample
/// ingestion, and trial capture.
///
/// Error code ranges: 1001-1011
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Pipeline is already running
    AlreadyRunning,

    /// Pipeline is not running
    NotRunning,

    /// Classifier expects a different flattened window length
    ShapeMismatch { expected: usize, actual: usize },

    /// Configuration value rejected at startup
    InvalidConfig { reason: String },

    /// Sample source failed to start
    SourceUnavailable { reason: String },

    /// Sample channel count does not match the configured channel count
    SampleShape { expected: usize, actual: usize },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Worker thread could not be spawned or panicked
    WorkerFailed { reason: String },

    /// Trial capture could not be started
    CaptureRejected { reason: String },

    /// No trial capture is active
    NoActiveCapture,

    /// Classifier model could not be loaded
    InvalidModel { reason: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::AlreadyRunning => PipelineErrorCodes::ALREADY_RUNNING,
            PipelineError::NotRunning => PipelineErrorCodes::NOT_RUNNING,
            PipelineError::ShapeMismatch { .. } => PipelineErrorCodes::SHAPE_MISMATCH,
            PipelineError::InvalidConfig { .. } => PipelineErrorCodes::INVALID_CONFIG,
            PipelineError::SourceUnavailable { .. } => PipelineErrorCodes::SOURCE_UNAVAILABLE,
            PipelineError::SampleShape { .. } => PipelineErrorCodes::SAMPLE_SHAPE,
            PipelineError::LockPoisoned { .. } => PipelineErrorCodes::LOCK_POISONED,
            PipelineError::WorkerFailed { .. } => PipelineErrorCodes::WORKER_FAILED,
            PipelineError::CaptureRejected { .. } => PipelineErrorCodes::CAPTURE_REJECTED,
            PipelineError::NoActiveCapture => PipelineErrorCodes::NO_ACTIVE_CAPTURE,
            PipelineError::InvalidModel { .. } => PipelineErrorCodes::INVALID_MODEL,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::AlreadyRunning => {
                "Pipeline already running. Call stop() first.".to_string()
            }
            PipelineError::NotRunning => "Pipeline not running. Call start() first.".to_string(),
            PipelineError::ShapeMismatch { expected, actual } => {
                format!(
                    "Classifier expects input length {} but pipeline produces {}",
                    expected, actual
                )
            }
            PipelineError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
            PipelineError::SourceUnavailable { reason } => {
                format!("Sample source unavailable: {}", reason)
            }
            PipelineError::SampleShape { expected, actual } => {
                format!("Sample has {} channels, expected {}", actual, expected)
            }
            PipelineError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            PipelineError::WorkerFailed { reason } => {
                format!("Worker thread failed: {}", reason)
            }
            PipelineError::CaptureRejected { reason } => {
                format!("Capture rejected: {}", reason)
            }
            PipelineError::NoActiveCapture => "No trial capture in progress".to_string(),
            PipelineError::InvalidModel { reason } => {
                format!("Invalid classifier model: {}", reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::WorkerFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_codes() {
        assert_eq!(PipelineError::AlreadyRunning.code(), 1001);
        assert_eq!(PipelineError::NotRunning.code(), 1002);
        assert_eq!(
            PipelineError::ShapeMismatch {
                expected: 240,
                actual: 80
            }
            .code(),
            1003
        );
        assert_eq!(
            PipelineError::InvalidConfig {
                reason: "test".to_string()
            }
            .code(),
            1004
        );
        assert_eq!(
            PipelineError::SourceUnavailable {
                reason: "test".to_string()
            }
            .code(),
            1005
        );
        assert_eq!(
            PipelineError::SampleShape {
                expected: 8,
                actual: 4
            }
            .code(),
            1006
        );
        assert_eq!(
            PipelineError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            1007
        );
        assert_eq!(
            PipelineError::WorkerFailed {
                reason: "test".to_string()
            }
            .code(),
            1008
        );
        assert_eq!(
            PipelineError::CaptureRejected {
                reason: "test".to_string()
            }
            .code(),
            1009
        );
        assert_eq!(PipelineError::NoActiveCapture.code(), 1010);
        assert_eq!(
            PipelineError::InvalidModel {
                reason: "test".to_string()
            }
            .code(),
            1011
        );
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = PipelineError::ShapeMismatch {
            expected: 240,
            actual: 80,
        };
        assert!(err.message().contains("240"));
        assert!(err.message().contains("80"));
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::NotRunning;
        let display = format!("{}", err);
        assert!(display.contains("PipelineError"));
        assert!(display.contains("1002"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "spawn refused");
        let err: PipelineError = io_err.into();

        match err {
            PipelineError::WorkerFailed { reason } => {
                assert!(reason.contains("spawn refused"));
            }
            other => panic!("Expected WorkerFailed variant, got {:?}", other),
        }
    }
}
