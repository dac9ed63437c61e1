// Classifier - boundary to the externally trained gesture model
//
// The recognition loop only needs `predict(window) -> label`. The model's window
// shape is fixed at training time, so the pipeline checks it once at startup
// (check_shape) instead of on every prediction.
//
// NearestCentroidClassifier is a small reference model loaded from JSON. It is a
// stand-in for whatever the training side exports; training itself happens
// elsewhere.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Pure window-to-label function
///
/// Implementations must be stateless from the caller's point of view; the
/// recognition worker calls `predict` from its own thread.
pub trait Classifier: Send + Sync {
    /// Expected length of the flattened window (W * N)
    fn input_len(&self) -> usize;

    /// Map a row-major window of `input_len()` floats to a label
    fn predict(&self, window: &[f32]) -> i32;
}

/// Verify that `classifier` accepts windows of `window_size` x `channel_count`
pub fn check_shape(
    classifier: &dyn Classifier,
    window_size: usize,
    channel_count: usize,
) -> Result<(), PipelineError> {
    let actual = window_size * channel_count;
    let expected = classifier.input_len();
    if expected != actual {
        return Err(PipelineError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// One labelled centroid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub label: i32,
    pub vector: Vec<f32>,
}

/// On-disk model format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CentroidModel {
    window_size: usize,
    channel_count: usize,
    centroids: Vec<Centroid>,
}

/// Predicts the label of the closest centroid (squared Euclidean distance)
///
/// Equal distances resolve to the smaller label.
#[derive(Debug, Clone)]
pub struct NearestCentroidClassifier {
    input_len: usize,
    centroids: Vec<Centroid>,
}

impl NearestCentroidClassifier {
    /// Build from centroids that must all have length `input_len`
    pub fn from_centroids(
        input_len: usize,
        centroids: Vec<Centroid>,
    ) -> Result<Self, PipelineError> {
        if input_len == 0 {
            return Err(PipelineError::InvalidModel {
                reason: "input length must be > 0".to_string(),
            });
        }
        if centroids.is_empty() {
            return Err(PipelineError::InvalidModel {
                reason: "model has no centroids".to_string(),
            });
        }
        if let Some(bad) = centroids.iter().find(|c| c.vector.len() != input_len) {
            return Err(PipelineError::InvalidModel {
                reason: format!(
                    "centroid for label {} has length {}, expected {}",
                    bad.label,
                    bad.vector.len(),
                    input_len
                ),
            });
        }

        Ok(Self {
            input_len,
            centroids,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let model: CentroidModel =
            serde_json::from_str(json).map_err(|err| PipelineError::InvalidModel {
                reason: format!("failed to parse model JSON: {}", err),
            })?;
        Self::from_centroids(model.window_size * model.channel_count, model.centroids)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let contents =
            fs::read_to_string(&path).map_err(|err| PipelineError::InvalidModel {
                reason: format!("failed to read {:?}: {}", path.as_ref(), err),
            })?;
        let classifier = Self::from_json_str(&contents)?;
        log::info!(
            "[Classifier] Loaded {} centroids from {:?}",
            classifier.centroids.len(),
            path.as_ref()
        );
        Ok(classifier)
    }

    pub fn labels(&self) -> Vec<i32> {
        self.centroids.iter().map(|c| c.label).collect()
    }
}

impl Classifier for NearestCentroidClassifier {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn predict(&self, window: &[f32]) -> i32 {
        let mut best: Option<(f32, i32)> = None;
        for centroid in &self.centroids {
            let distance: f32 = centroid
                .vector
                .iter()
                .zip(window)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();

            let better = match best {
                None => true,
                Some((best_distance, best_label)) => {
                    distance < best_distance
                        || (distance == best_distance && centroid.label < best_label)
                }
            };
            if better {
                best = Some((distance, centroid.label));
            }
        }

        // from_centroids guarantees at least one centroid
        best.map(|(_, label)| label).unwrap_or_default()
    }
}
