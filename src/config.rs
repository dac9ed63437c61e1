//! Configuration management for the recognition pipeline
//!
//! This module provides runtime configuration loading from JSON files, so that
//! window shape, smoothing depth, cooldown, and calibration timing can be tuned
//! without recompiling. The window shape must match the shape the external
//! classifier was trained with; `Pipeline::new` checks this once at startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::window::Preprocess;
use crate::error::PipelineError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Sliding window shape and pre-window transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Number of samples per classification window (W)
    pub window_size: usize,
    /// Number of channels per sample (N)
    pub channel_count: usize,
    /// Elementwise transform applied before a sample enters the window
    #[serde(default)]
    pub preprocess: Preprocess,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            channel_count: 8,
            preprocess: Preprocess::default(),
        }
    }
}

impl WindowConfig {
    /// Length of the flattened feature vector handed to the classifier
    pub fn input_len(&self) -> usize {
        self.window_size * self.channel_count
    }
}

/// Majority-vote smoothing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Number of raw labels kept for the majority vote (K)
    pub history_len: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { history_len: 3 }
    }
}

/// Action dispatch parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum interval between two dispatched actions
    pub cooldown_ms: u64,
    /// Slots in the UI mailbox
    pub mailbox_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 400,
            mailbox_capacity: 64,
        }
    }
}

impl DispatchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Ingest queue and consumer loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Consumer loop period
    pub tick_ms: u64,
    /// Optional backlog cap; when reached the oldest queued sample is dropped.
    /// `None` keeps every sample.
    #[serde(default)]
    pub max_backlog: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tick_ms: 5,
            max_backlog: None,
        }
    }
}

impl IngestConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Rest-state calibration session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// How long the session collects samples
    pub duration_ms: u64,
    /// Timeout on each tap read, so the worker can observe its deadline
    pub poll_timeout_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 3000,
            poll_timeout_ms: 100,
        }
    }
}

impl CalibrationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Sample source parameters (used by the synthetic source)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Expected device sample rate
    pub sample_rate_hz: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration. If the file doesn't exist or the JSON is invalid,
    /// a warning is logged and the defaults are returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        let checks = [
            (self.window.window_size == 0, "window.window_size must be > 0"),
            (
                self.window.channel_count == 0,
                "window.channel_count must be > 0",
            ),
            (
                self.smoothing.history_len == 0,
                "smoothing.history_len must be > 0",
            ),
            (self.ingest.tick_ms == 0, "ingest.tick_ms must be > 0"),
            (
                self.ingest.max_backlog == Some(0),
                "ingest.max_backlog must be > 0 when set",
            ),
            (
                self.dispatch.mailbox_capacity == 0,
                "dispatch.mailbox_capacity must be > 0",
            ),
            (
                self.calibration.poll_timeout_ms == 0,
                "calibration.poll_timeout_ms must be > 0",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(PipelineError::InvalidConfig {
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}
