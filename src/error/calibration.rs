// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration already in progress
    pub const ALREADY_IN_PROGRESS: i32 = 2001;

    /// A trial capture is active; calibration must wait for it to stop
    pub const CAPTURE_ACTIVE: i32 = 2002;

    /// Calibration profile RwLock was poisoned
    pub const STATE_POISONED: i32 = 2003;

    /// Calibration worker could not be spawned or panicked
    pub const WORKER_FAILED: i32 = 2004;

    /// No calibration session to wait on
    pub const NOT_IN_PROGRESS: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=Calibrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover the rest-state calibration session and profile storage.
///
/// Error code ranges: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration already in progress
    AlreadyInProgress,

    /// A trial capture is active
    CaptureActive,

    /// Calibration profile RwLock was poisoned
    StatePoisoned,

    /// Calibration worker could not be spawned or panicked
    WorkerFailed { reason: String },

    /// No calibration session to wait on
    NotInProgress,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::CaptureActive => CalibrationErrorCodes::CAPTURE_ACTIVE,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::WorkerFailed { .. } => CalibrationErrorCodes::WORKER_FAILED,
            CalibrationError::NotInProgress => CalibrationErrorCodes::NOT_IN_PROGRESS,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::AlreadyInProgress => "Calibration already in progress".to_string(),
            CalibrationError::CaptureActive => {
                "Stop the current capture before calibration".to_string()
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
            CalibrationError::WorkerFailed { reason } => {
                format!("Calibration worker failed: {}", reason)
            }
            CalibrationError::NotInProgress => "No calibration in progress".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::AlreadyInProgress.code(),
            CalibrationErrorCodes::ALREADY_IN_PROGRESS
        );
        assert_eq!(
            CalibrationError::CaptureActive.code(),
            CalibrationErrorCodes::CAPTURE_ACTIVE
        );
        assert_eq!(
            CalibrationError::StatePoisoned.code(),
            CalibrationErrorCodes::STATE_POISONED
        );
        assert_eq!(
            CalibrationError::WorkerFailed {
                reason: "test".to_string()
            }
            .code(),
            CalibrationErrorCodes::WORKER_FAILED
        );
        assert_eq!(
            CalibrationError::NotInProgress.code(),
            CalibrationErrorCodes::NOT_IN_PROGRESS
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::AlreadyInProgress;
        assert!(err.message().contains("already in progress"));

        let err = CalibrationError::CaptureActive;
        assert!(err.message().contains("capture"));

        let err = CalibrationError::WorkerFailed {
            reason: "panicked".to_string(),
        };
        assert_eq!(err.message(), "Calibration worker failed: panicked");
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::StatePoisoned;
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
