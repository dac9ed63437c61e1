//! Sample source abstractions.
//!
//! A source owns its producer thread and pushes [Sample]s into the ingest queue.
//! Device binding lives outside this crate; the sources here cover simulation,
//! replay, and the "no device" case.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{now_timestamp_ns, Sample, SampleSender};
use crate::error::PipelineError;

/// Trait implemented by anything that produces samples.
///
/// `start` hands the source the producer half of the ingest queue; `stop`
/// must signal the producer thread and join it before returning.
pub trait SampleSource: Send {
    fn start(&mut self, sender: SampleSender) -> Result<(), PipelineError>;
    fn stop(&mut self);
    fn name(&self) -> &str;
}

/// Simulated Myo-style armband.
///
/// Emits rest noise at the configured rate and, every few seconds, a half-second
/// burst on one half of the channels. Bursts alternate between the lower and the
/// upper channel group so a demo classifier sees both "directions".
pub struct SyntheticSource {
    channel_count: usize,
    sample_rate_hz: u32,
    seed: Option<u64>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(channel_count: usize, sample_rate_hz: u32) -> Self {
        Self {
            channel_count,
            sample_rate_hz: sample_rate_hz.max(1),
            seed: None,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Fix the RNG seed for reproducible streams
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Produces synthetic channel vectors
struct SignalModel {
    rng: StdRng,
    channel_count: usize,
    sample_rate_hz: u32,
    tick: u64,
}

impl SignalModel {
    const REST_AMPLITUDE: i32 = 4;
    const BURST_AMPLITUDE: i32 = 60;
    const BURST_PERIOD_S: u64 = 3;
    const BURST_LEN_MS: u64 = 500;

    fn next(&mut self) -> Vec<i32> {
        let rate = self.sample_rate_hz as u64;
        let period = Self::BURST_PERIOD_S * rate;
        let burst_len = Self::BURST_LEN_MS * rate / 1000;
        let phase = self.tick % period;
        let cycle = self.tick / period;
        self.tick += 1;

        let half = self.channel_count / 2;
        let active = if phase < burst_len {
            if cycle % 2 == 0 {
                Some(0..half)
            } else {
                Some(half..self.channel_count)
            }
        } else {
            None
        };

        (0..self.channel_count)
            .map(|ch| {
                let amplitude = match &active {
                    Some(range) if range.contains(&ch) => Self::BURST_AMPLITUDE,
                    _ => Self::REST_AMPLITUDE,
                };
                self.rng.gen_range(-amplitude..=amplitude)
            })
            .collect()
    }
}

impl SampleSource for SyntheticSource {
    fn start(&mut self, sender: SampleSender) -> Result<(), PipelineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyRunning);
        }

        let mut model = SignalModel {
            rng: match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            channel_count: self.channel_count,
            sample_rate_hz: self.sample_rate_hz,
            tick: 0,
        };
        let period = Duration::from_nanos(1_000_000_000 / self.sample_rate_hz as u64);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("synthetic-source".to_string())
            .spawn(move || {
                tracing::info!("[SyntheticSource] Producer thread started");
                let mut emitted: u64 = 0;
                while running.load(Ordering::SeqCst) {
                    sender.push(Sample::new(now_timestamp_ns(), model.next()));
                    emitted += 1;
                    thread::sleep(period);
                }
                tracing::info!("[SyntheticSource] Producer stopped after {} samples", emitted);
            })
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                PipelineError::SourceUnavailable {
                    reason: format!("failed to spawn producer thread: {}", err),
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("[SyntheticSource] Producer thread panicked");
            }
        }
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Replays a fixed list of samples.
///
/// Without an interval every sample is pushed synchronously inside `start`,
/// which keeps tests deterministic. With an interval, a producer thread paces
/// the replay and can be stopped midway.
pub struct ReplaySource {
    samples: Vec<Sample>,
    interval: Option<Duration>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            interval: None,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl SampleSource for ReplaySource {
    fn start(&mut self, sender: SampleSender) -> Result<(), PipelineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyRunning);
        }

        let samples = self.samples.clone();
        let Some(interval) = self.interval else {
            for sample in samples {
                sender.push(sample);
            }
            return Ok(());
        };

        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("replay-source".to_string())
            .spawn(move || {
                for sample in samples {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    sender.push(sample);
                    thread::sleep(interval);
                }
            })
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                PipelineError::SourceUnavailable {
                    reason: format!("failed to spawn replay thread: {}", err),
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// A source whose device can never be opened.
///
/// Models a missing or unpaired armband: `start` always fails.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SampleSource for UnavailableSource {
    fn start(&mut self, _sender: SampleSender) -> Result<(), PipelineError> {
        Err(PipelineError::SourceUnavailable {
            reason: self.reason.clone(),
        })
    }

    fn stop(&mut self) {}

    fn name(&self) -> &str {
        "unavailable"
    }
}
