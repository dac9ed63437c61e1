// Gesture label map
//
// Classifier labels are small integers fixed at training time. This module is the
// static lookup from label to gesture name and from gesture to UI action.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Gesture recognised from a (smoothed) classifier label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// Rest, no muscle activity
    Neutral,
    /// Wrist flexion
    Flexion,
    /// Wrist extension
    Extension,
    Fist,
    /// Label outside the trained set
    Unknown(i32),
}

/// Effect the UI should apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    Increase,
    Decrease,
}

impl Gesture {
    pub fn from_label(label: i32) -> Self {
        match label {
            0 => Gesture::Neutral,
            1 => Gesture::Flexion,
            2 => Gesture::Extension,
            7 => Gesture::Fist,
            other => Gesture::Unknown(other),
        }
    }

    pub fn label(&self) -> i32 {
        match *self {
            Gesture::Neutral => 0,
            Gesture::Flexion => 1,
            Gesture::Extension => 2,
            Gesture::Fist => 7,
            Gesture::Unknown(label) => label,
        }
    }

    /// Display name; unresolved labels render as `label_<n>`
    pub fn name(&self) -> String {
        match self {
            Gesture::Neutral => "neutral".to_string(),
            Gesture::Flexion => "flexion".to_string(),
            Gesture::Extension => "extension".to_string(),
            Gesture::Fist => "fist".to_string(),
            Gesture::Unknown(label) => format!("label_{}", label),
        }
    }

    /// UI action bound to this gesture, if any
    pub fn action(&self) -> Option<UiAction> {
        match self {
            Gesture::Extension => Some(UiAction::Increase),
            Gesture::Flexion => Some(UiAction::Decrease),
            _ => None,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
