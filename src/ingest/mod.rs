// Ingest module - sample types, producer/consumer hand-off, and sample sources
//
// Samples flow from a SampleSource (producer thread) through the IngestQueue to
// the single recognition worker. A calibration session may open a tap on the
// queue to receive its own copy of every sample pushed while the tap is open.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub mod queue;
pub mod source;

pub use queue::{IngestChannels, IngestQueue, SampleReceiver, SampleSender, SampleTap, TapHandle};
pub use source::{ReplaySource, SampleSource, SyntheticSource, UnavailableSource};

/// A single timestamped multi-channel reading
///
/// Immutable once produced; fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    timestamp_ns: u64,
    channels: Vec<i32>,
}

impl Sample {
    pub fn new(timestamp_ns: u64, channels: Vec<i32>) -> Self {
        Self {
            timestamp_ns,
            channels,
        }
    }

    /// Build a sample stamped with the current wall-clock time
    pub fn now(channels: Vec<i32>) -> Self {
        Self::new(now_timestamp_ns(), channels)
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn channels(&self) -> &[i32] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Wall-clock nanoseconds since the Unix epoch
pub fn now_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
