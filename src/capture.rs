//! Trial capture: normalized frames recorded between start and stop.
//!
//! Persisting a trial (CSV or otherwise) is left to the caller.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One calibrated sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFrame {
    pub timestamp_ns: u64,
    pub values: Vec<f64>,
}

/// Frames recorded for one labelled trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialCapture {
    pub label: String,
    pub trial_id: String,
    pub started_at_ns: u64,
    pub frames: Vec<NormalizedFrame>,
}

impl TrialCapture {
    /// Start an empty capture; an empty `trial_id` is replaced by a random one
    pub fn new(label: impl Into<String>, trial_id: impl Into<String>, started_at_ns: u64) -> Self {
        let trial_id = trial_id.into();
        Self {
            label: label.into(),
            trial_id: if trial_id.is_empty() {
                new_trial_id()
            } else {
                trial_id
            },
            started_at_ns,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, timestamp_ns: u64, values: Vec<f64>) {
        self.frames.push(NormalizedFrame {
            timestamp_ns,
            values,
        });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Random 8 hex character id
pub fn new_trial_id() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_is_eight_hex_chars() {
        let id = new_trial_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_id_is_replaced() {
        let capture = TrialCapture::new("fist", "", 0);
        assert_eq!(capture.trial_id.len(), 8);

        let capture = TrialCapture::new("fist", "t-01", 0);
        assert_eq!(capture.trial_id, "t-01");
    }

    #[test]
    fn frames_append_in_order() {
        let mut capture = TrialCapture::new("flexion", "a", 0);
        capture.push(1, vec![0.5]);
        capture.push(2, vec![-0.5]);

        assert_eq!(capture.len(), 2);
        assert_eq!(capture.frames[1].timestamp_ns, 2);
    }
}
