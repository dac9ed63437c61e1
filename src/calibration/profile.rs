// CalibrationProfile / Calibrator - per-channel rest-state normalization
//
// A profile holds the mean and sample standard deviation of every channel,
// measured while the arm is at rest. Profiles are immutable: `fit` builds a new
// one completely and then swaps the shared pointer, so a concurrent `transform`
// sees either the old profile or the new one, never a mix.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Mean and standard deviation of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    /// Never 0; zero-variance channels store 1.0
    pub std: f64,
}

/// Immutable per-channel baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    channels: Vec<ChannelStats>,
    sample_count: usize,
}

impl CalibrationProfile {
    /// Compute a profile from a batch of channel vectors
    ///
    /// Uses Bessel's correction (denominator `max(1, n - 1)`) and substitutes
    /// 1.0 for a zero standard deviation. Rows may differ in length; only the
    /// channels present in every row are profiled. Returns `None` for an empty
    /// batch.
    pub fn from_batch(batch: &[Vec<i32>]) -> Option<Self> {
        let n = batch.len();
        let channel_count = batch.iter().map(Vec::len).min()?;

        let mut channels = Vec::with_capacity(channel_count);
        for ch in 0..channel_count {
            let mean = batch.iter().map(|row| row[ch] as f64).sum::<f64>() / n as f64;
            let sum_sq: f64 = batch
                .iter()
                .map(|row| {
                    let d = row[ch] as f64 - mean;
                    d * d
                })
                .sum();
            let denominator = n.saturating_sub(1).max(1) as f64;
            let std = (sum_sq / denominator).sqrt();

            channels.push(ChannelStats {
                mean,
                std: if std == 0.0 { 1.0 } else { std },
            });
        }

        Some(Self {
            channels,
            sample_count: n,
        })
    }

    /// Build a profile from known statistics (zero std is still replaced by 1.0)
    pub fn from_stats(channels: Vec<ChannelStats>) -> Self {
        let channels = channels
            .into_iter()
            .map(|stats| ChannelStats {
                mean: stats.mean,
                std: if stats.std == 0.0 { 1.0 } else { stats.std },
            })
            .collect();
        Self {
            channels,
            sample_count: 0,
        }
    }

    pub fn channels(&self) -> &[ChannelStats] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples the profile was fitted on
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// `(raw - mean) / std` per channel; channels beyond the profile pass through
    pub fn normalize(&self, raw: &[i32]) -> Vec<f64> {
        raw.iter()
            .enumerate()
            .map(|(ch, &value)| match self.channels.get(ch) {
                Some(stats) => (value as f64 - stats.mean) / stats.std,
                None => value as f64,
            })
            .collect()
    }
}

/// Holder of the currently published profile
///
/// `fit` is the only writer. Readers clone the `Arc` under a short read lock and
/// then work on their own snapshot.
#[derive(Debug, Default)]
pub struct Calibrator {
    profile: RwLock<Option<Arc<CalibrationProfile>>>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a new profile and publish it
    ///
    /// An empty batch is a no-op that returns `Ok(None)`; the previous profile
    /// (or identity, if never fitted) stays in effect.
    pub fn fit(
        &self,
        batch: &[Vec<i32>],
    ) -> Result<Option<Arc<CalibrationProfile>>, CalibrationError> {
        let Some(profile) = CalibrationProfile::from_batch(batch) else {
            log::info!("[Calibrator] Empty batch, keeping current profile");
            return Ok(None);
        };
        let profile = Arc::new(profile);
        self.publish(Arc::clone(&profile))?;

        log::info!(
            "[Calibrator] Published profile: {} channels from {} samples",
            profile.channel_count(),
            profile.sample_count()
        );
        Ok(Some(profile))
    }

    fn publish(&self, profile: Arc<CalibrationProfile>) -> Result<(), CalibrationError> {
        let mut slot = self
            .profile
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        *slot = Some(profile);
        Ok(())
    }

    /// Currently published profile, if any
    pub fn profile(&self) -> Option<Arc<CalibrationProfile>> {
        match self.profile.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.profile().is_some()
    }

    /// Normalize one raw channel vector with the published profile
    ///
    /// Identity (cast to float) when no profile has been fitted.
    pub fn transform(&self, raw: &[i32]) -> Vec<f64> {
        match self.profile() {
            Some(profile) => profile.normalize(raw),
            None => raw.iter().map(|&v| v as f64).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_unfitted_transform_is_identity() {
        let calibrator = Calibrator::new();
        assert!(!calibrator.is_calibrated());
        assert_eq!(calibrator.transform(&[3, -4, 0]), vec![3.0, -4.0, 0.0]);
    }

    #[test]
    fn test_fit_uses_sample_std() {
        let calibrator = Calibrator::new();
        // Channel 0: 2, 4, 6 -> mean 4, sample var 4, std 2
        let batch = vec![vec![2, 10], vec![4, 10], vec![6, 10]];
        let profile = calibrator.fit(&batch).unwrap().unwrap();

        assert_close(profile.channels()[0].mean, 4.0);
        assert_close(profile.channels()[0].std, 2.0);
        assert_eq!(profile.sample_count(), 3);

        let out = calibrator.transform(&[8, 13]);
        assert_close(out[0], 2.0);
        // Constant channel: std substituted with 1.0, output is v - mean
        assert_close(profile.channels()[1].std, 1.0);
        assert_close(out[1], 3.0);
    }

    #[test]
    fn test_single_sample_batch() {
        let calibrator = Calibrator::new();
        let profile = calibrator.fit(&[vec![5, -5]]).unwrap().unwrap();

        assert_close(profile.channels()[0].mean, 5.0);
        assert_close(profile.channels()[0].std, 1.0);
        assert_eq!(calibrator.transform(&[5, -5]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_batch_keeps_previous_profile() {
        let calibrator = Calibrator::new();
        assert!(calibrator.fit(&[]).unwrap().is_none());
        assert_eq!(calibrator.transform(&[7]), vec![7.0]);

        calibrator.fit(&[vec![1], vec![3]]).unwrap();
        let before = calibrator.profile().unwrap();
        assert!(calibrator.fit(&[]).unwrap().is_none());
        assert_eq!(*calibrator.profile().unwrap(), *before);
    }

    #[test]
    fn test_ragged_batch_uses_common_channels() {
        let profile = CalibrationProfile::from_batch(&[vec![1, 2, 3], vec![1, 2]]).unwrap();
        assert_eq!(profile.channel_count(), 2);
        // Channel 2 is not profiled and passes through.
        assert_eq!(profile.normalize(&[1, 2, 9])[2], 9.0);
    }

    #[test]
    fn test_from_stats_replaces_zero_std() {
        let profile = CalibrationProfile::from_stats(vec![ChannelStats {
            mean: 1.0,
            std: 0.0,
        }]);
        assert_close(profile.channels()[0].std, 1.0);
    }

    #[test]
    fn test_readers_never_see_mixed_profiles() {
        use std::thread;

        let calibrator = Arc::new(Calibrator::new());
        // Profile A: every channel mean 0. Profile B: every channel mean 100.
        let batch_a: Vec<Vec<i32>> = vec![vec![-1; 8], vec![1; 8]];
        let batch_b: Vec<Vec<i32>> = vec![vec![99; 8], vec![101; 8]];
        calibrator.fit(&batch_a).unwrap();

        let writer = {
            let calibrator = Arc::clone(&calibrator);
            thread::spawn(move || {
                for i in 0..200 {
                    let batch = if i % 2 == 0 { &batch_b } else { &batch_a };
                    calibrator.fit(batch).unwrap();
                }
            })
        };

        for _ in 0..2000 {
            let out = calibrator.transform(&[100; 8]);
            let first = out[0];
            assert!(out.iter().all(|&v| v == first), "mixed profile: {:?}", out);
        }
        writer.join().unwrap();
    }
}
