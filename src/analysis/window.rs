// WindowBuffer - fixed-capacity sliding window over preprocessed samples
//
// Stores the most recent W samples of N channels in one flat ring of W*N floats.
// Pushing never allocates after construction; a snapshot copies the ring out in
// age order (oldest sample first, channels in order within a sample), which is
// the row-major layout the classifier expects.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Elementwise transform applied to a raw reading before it enters the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preprocess {
    /// Raw integer cast to float
    Raw,
    /// `|v| * factor`
    AbsScaled { factor: f32 },
}

impl Default for Preprocess {
    fn default() -> Self {
        Preprocess::AbsScaled { factor: 10.0 }
    }
}

impl Preprocess {
    #[inline]
    pub fn apply(&self, raw: i32) -> f32 {
        match *self {
            Preprocess::Raw => raw as f32,
            Preprocess::AbsScaled { factor } => (raw as f32).abs() * factor,
        }
    }
}

/// Sliding window of the last `window_size` samples
pub struct WindowBuffer {
    window_size: usize,
    channel_count: usize,
    data: Vec<f32>,
    /// Slot index of the oldest sample
    start: usize,
    /// Number of samples held (<= window_size)
    len: usize,
}

impl WindowBuffer {
    pub fn new(window_size: usize, channel_count: usize) -> Self {
        Self {
            window_size,
            channel_count,
            data: vec![0.0; window_size * channel_count],
            start: 0,
            len: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one raw sample, evicting the oldest once the window is full
    ///
    /// `preprocess` is applied to every channel value. A sample whose channel
    /// count differs from the window's is rejected and leaves the window as is.
    pub fn push<F>(&mut self, raw: &[i32], preprocess: F) -> Result<(), PipelineError>
    where
        F: Fn(i32) -> f32,
    {
        if raw.len() != self.channel_count {
            return Err(PipelineError::SampleShape {
                expected: self.channel_count,
                actual: raw.len(),
            });
        }
        if self.window_size == 0 {
            return Ok(());
        }

        let slot = if self.len < self.window_size {
            let slot = (self.start + self.len) % self.window_size;
            self.len += 1;
            slot
        } else {
            // Full: overwrite the oldest and advance.
            let slot = self.start;
            self.start = (self.start + 1) % self.window_size;
            slot
        };

        let offset = slot * self.channel_count;
        for (dst, &value) in self.data[offset..offset + self.channel_count]
            .iter_mut()
            .zip(raw)
        {
            *dst = preprocess(value);
        }
        Ok(())
    }

    /// True once `window_size` samples are held; stays true afterwards
    pub fn is_ready(&self) -> bool {
        self.window_size > 0 && self.len == self.window_size
    }

    /// Flattened copy of the window, oldest sample first
    ///
    /// Returns `None` until the window is ready.
    pub fn snapshot(&self) -> Option<Vec<f32>> {
        let mut out = Vec::with_capacity(self.data.len());
        self.snapshot_into(&mut out).then_some(out)
    }

    /// Like [WindowBuffer::snapshot] but reuses `out`
    ///
    /// Returns false (leaving `out` cleared) when the window is not ready.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) -> bool {
        out.clear();
        if !self.is_ready() {
            return false;
        }
        let split = self.start * self.channel_count;
        out.extend_from_slice(&self.data[split..]);
        out.extend_from_slice(&self.data[..split]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(v: i32, n: usize) -> Vec<i32> {
        vec![v; n]
    }

    #[test]
    fn test_not_ready_until_full() {
        let mut window = WindowBuffer::new(3, 2);
        window.push(&raw(1, 2), |v| v as f32).unwrap();
        window.push(&raw(2, 2), |v| v as f32).unwrap();

        assert!(!window.is_ready());
        assert!(window.snapshot().is_none());

        window.push(&raw(3, 2), |v| v as f32).unwrap();
        assert!(window.is_ready());
        assert_eq!(
            window.snapshot().unwrap(),
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]
        );
    }

    #[test]
    fn test_keeps_most_recent_in_arrival_order() {
        let mut window = WindowBuffer::new(3, 1);
        for v in 0..10 {
            window.push(&[v], |v| v as f32).unwrap();
            assert!(window.len() <= 3);
        }

        assert!(window.is_ready());
        assert_eq!(window.snapshot().unwrap(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_ready_is_sticky() {
        let mut window = WindowBuffer::new(2, 1);
        window.push(&[1], |v| v as f32).unwrap();
        window.push(&[2], |v| v as f32).unwrap();
        for v in 3..20 {
            window.push(&[v], |v| v as f32).unwrap();
            assert!(window.is_ready());
        }
    }

    #[test]
    fn test_preprocess_applied_per_channel() {
        let mut window = WindowBuffer::new(1, 3);
        let preprocess = Preprocess::default();
        window.push(&[-2, 0, 5], |v| preprocess.apply(v)).unwrap();

        assert_eq!(window.snapshot().unwrap(), vec![20.0, 0.0, 50.0]);
    }

    #[test]
    fn test_wrong_channel_count_rejected() {
        let mut window = WindowBuffer::new(2, 4);
        let err = window.push(&[1, 2, 3], |v| v as f32).unwrap_err();

        assert_eq!(
            err,
            PipelineError::SampleShape {
                expected: 4,
                actual: 3
            }
        );
        assert!(window.is_empty());
    }

    #[test]
    fn test_snapshot_into_reuses_buffer() {
        let mut window = WindowBuffer::new(2, 2);
        let mut out = vec![99.0; 16];
        assert!(!window.snapshot_into(&mut out));
        assert!(out.is_empty());

        window.push(&[1, 2], |v| v as f32).unwrap();
        window.push(&[3, 4], |v| v as f32).unwrap();
        window.push(&[5, 6], |v| v as f32).unwrap();
        assert!(window.snapshot_into(&mut out));
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_preprocess_raw_and_scaled() {
        assert_eq!(Preprocess::Raw.apply(-7), -7.0);
        assert_eq!(Preprocess::AbsScaled { factor: 2.0 }.apply(-7), 14.0);
    }
}
