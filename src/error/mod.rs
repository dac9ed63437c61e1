// Error types for the EMG gesture pipeline
//
// This module defines custom error types for pipeline lifecycle, calibration, and
// UI dispatch operations, providing structured error handling with numeric codes.

mod calibration;
mod dispatch;
mod pipeline;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use dispatch::{log_dispatch_error, DispatchError, DispatchErrorCodes};
pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so callers (CLI, telemetry) can report them
/// consistently.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
