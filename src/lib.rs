// EMG Gesture Core - real-time gesture recognition pipeline
// Sliding-window classification of multi-channel EMG with debounced UI dispatch

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::classifier::{check_shape, Classifier, NearestCentroidClassifier};
pub use analysis::gesture::{Gesture, UiAction};
pub use analysis::stats::StatsSnapshot;
pub use analysis::RecognitionEvent;
pub use calibration::{CalibrationProfile, CalibrationReport, Calibrator};
pub use capture::TrialCapture;
pub use config::AppConfig;
pub use dispatch::{BrushSize, DispatchStatus, MailboxChannels, UiEffects, UiMailbox};
pub use engine::Pipeline;
pub use error::{CalibrationError, DispatchError, ErrorCode, PipelineError};
pub use ingest::{Sample, SampleSource};
