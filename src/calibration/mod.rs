// Calibration module - rest-state baseline and its collection workflow
//
// This module provides two main components:
// 1. Calibrator: holds the published per-channel profile and normalizes samples
// 2. CalibrationSession: collects rest samples from an ingest tap for a fixed
//    duration on its own thread, then fits the Calibrator
//
// The calibration workflow:
// 1. Pipeline opens a tap on the ingest queue
// 2. CalibrationSession collects until its deadline (or cancel)
// 3. Calibrator::fit publishes the new profile atomically
// 4. The report is broadcast to subscribers

pub mod profile;
pub mod session;

pub use profile::{CalibrationProfile, Calibrator, ChannelStats};
pub use session::{CalibrationReport, CalibrationSession};
