// IngestQueue - producer to consumer hand-off for raw samples
//
// Built on a crossbeam MPMC channel used in a single-producer/single-consumer
// pattern. The producer never blocks: `push` either enqueues or, when a backlog
// cap is configured and reached, evicts the oldest queued sample first.
//
// Architecture:
// - SampleSender: held by the sample source's producer thread
// - SampleReceiver: held by the recognition worker, drained every tick
// - TapHandle: opens a SampleTap that receives a copy of each pushed sample
//   (used by the calibration session)
//
// Sample flow:
// 1. Producer calls push(sample)
// 2. If a tap is open, a clone is forwarded to it
// 3. Sample is appended to the queue (oldest evicted if over the cap)
// 4. Consumer calls drain_all() and processes samples in arrival order

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::Sample;

/// Counters and tap slot shared by every handle of one queue
#[derive(Default)]
struct Shared {
    tap: RwLock<Option<(u64, Sender<Sample>)>>,
    next_tap_id: AtomicU64,
    dropped: AtomicU64,
}

/// Handles returned by [IngestQueue::new]
pub struct IngestChannels {
    /// Producer side, handed to the sample source
    pub sender: SampleSender,
    /// Consumer side, owned by the recognition worker
    pub receiver: SampleReceiver,
    /// Opens calibration taps
    pub taps: TapHandle,
}

/// Unbounded (or drop-oldest capped) sample queue
///
/// # Example
/// ```ignore
/// let channels = IngestQueue::new(None);
///
/// // In producer thread:
/// channels.sender.push(Sample::now(vec![0; 8]));
///
/// // In consumer loop:
/// for sample in channels.receiver.drain_all() {
///     // process in arrival order
/// }
/// ```
pub struct IngestQueue;

impl IngestQueue {
    /// Create a new queue
    ///
    /// # Arguments
    /// * `max_backlog` - `None` keeps every sample; `Some(n)` keeps at most `n`
    ///   queued samples and drops the oldest when a push would exceed it
    #[allow(clippy::new_ret_no_self)]
    pub fn new(max_backlog: Option<usize>) -> IngestChannels {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::default());

        IngestChannels {
            sender: SampleSender {
                tx,
                evict_rx: rx.clone(),
                max_backlog: max_backlog.map(|cap| cap.max(1)),
                shared: Arc::clone(&shared),
            },
            receiver: SampleReceiver {
                rx,
                shared: Arc::clone(&shared),
            },
            taps: TapHandle { shared },
        }
    }
}

/// Producer half of the ingest queue
#[derive(Clone)]
pub struct SampleSender {
    tx: Sender<Sample>,
    // Only used to evict the oldest sample when the backlog cap is hit.
    evict_rx: Receiver<Sample>,
    max_backlog: Option<usize>,
    shared: Arc<Shared>,
}

impl SampleSender {
    /// Enqueue a sample without blocking
    ///
    /// Always succeeds. Arrival order is preserved. With a backlog cap, the
    /// oldest queued samples are discarded (and counted) to make room.
    pub fn push(&self, sample: Sample) {
        self.forward_to_tap(&sample);

        if let Some(cap) = self.max_backlog {
            while self.tx.len() >= cap {
                if self.evict_rx.try_recv().is_err() {
                    break;
                }
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        // `evict_rx` keeps the channel connected, so send cannot fail.
        let _ = self.tx.send(sample);
    }

    fn forward_to_tap(&self, sample: &Sample) {
        if let Ok(tap) = self.shared.tap.read() {
            if let Some((_, tx)) = tap.as_ref() {
                let _ = tx.send(sample.clone());
            }
        }
    }
}

/// Consumer half of the ingest queue
pub struct SampleReceiver {
    rx: Receiver<Sample>,
    shared: Arc<Shared>,
}

impl SampleReceiver {
    /// Take every currently queued sample, oldest first
    ///
    /// Non-blocking; returns an empty vector when nothing is queued.
    pub fn drain_all(&self) -> Vec<Sample> {
        self.rx.try_iter().collect()
    }

    /// Number of samples waiting to be drained
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }

    /// Samples discarded by the backlog cap
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Opens taps on the ingest queue
#[derive(Clone)]
pub struct TapHandle {
    shared: Arc<Shared>,
}

impl TapHandle {
    /// Open a tap that receives a copy of every sample pushed from now on
    ///
    /// Only one tap is active at a time; opening a new one replaces the old.
    /// The tap closes when the returned [SampleTap] is dropped.
    pub fn open(&self) -> SampleTap {
        let (tx, rx) = crossbeam_channel::unbounded();
        let id = self.shared.next_tap_id.fetch_add(1, Ordering::Relaxed);
        match self.shared.tap.write() {
            Ok(mut slot) => *slot = Some((id, tx)),
            Err(poisoned) => *poisoned.into_inner() = Some((id, tx)),
        }
        SampleTap {
            id,
            rx,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared
            .tap
            .read()
            .map(|tap| tap.is_some())
            .unwrap_or(false)
    }
}

/// Receiving end of a queue tap
pub struct SampleTap {
    id: u64,
    rx: Receiver<Sample>,
    shared: Arc<Shared>,
}

impl SampleTap {
    /// Wait up to `timeout` for the next tapped sample
    pub fn fetch(&self, timeout: Duration) -> Option<Sample> {
        match self.rx.recv_timeout(timeout) {
            Ok(sample) => Some(sample),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for SampleTap {
    fn drop(&mut self) {
        let mut slot = match self.shared.tap.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Only clear the slot if it still feeds this tap.
        if slot.as_ref().map(|(id, _)| *id == self.id).unwrap_or(false) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u64) -> Sample {
        Sample::new(ts, vec![ts as i32; 8])
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let channels = IngestQueue::new(None);
        for ts in 0..5 {
            channels.sender.push(sample(ts));
        }

        let drained: Vec<u64> = channels
            .receiver
            .drain_all()
            .iter()
            .map(Sample::timestamp_ns)
            .collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(channels.receiver.drain_all().is_empty());
    }

    #[test]
    fn test_unbounded_never_drops() {
        let channels = IngestQueue::new(None);
        for ts in 0..10_000 {
            channels.sender.push(sample(ts));
        }

        assert_eq!(channels.receiver.backlog(), 10_000);
        assert_eq!(channels.receiver.dropped(), 0);
    }

    #[test]
    fn test_backlog_cap_drops_oldest() {
        let channels = IngestQueue::new(Some(3));
        for ts in 0..5 {
            channels.sender.push(sample(ts));
        }

        let drained: Vec<u64> = channels
            .receiver
            .drain_all()
            .iter()
            .map(Sample::timestamp_ns)
            .collect();
        assert_eq!(drained, vec![2, 3, 4]);
        assert_eq!(channels.receiver.dropped(), 2);
    }

    #[test]
    fn test_tap_receives_copies_while_open() {
        let channels = IngestQueue::new(None);
        channels.sender.push(sample(0));

        let tap = channels.taps.open();
        assert!(channels.taps.is_open());
        channels.sender.push(sample(1));
        channels.sender.push(sample(2));

        assert_eq!(
            tap.fetch(Duration::from_millis(10)).map(|s| s.timestamp_ns()),
            Some(1)
        );
        assert_eq!(
            tap.fetch(Duration::from_millis(10)).map(|s| s.timestamp_ns()),
            Some(2)
        );
        assert!(tap.fetch(Duration::from_millis(10)).is_none());

        // The consumer still sees every sample.
        assert_eq!(channels.receiver.drain_all().len(), 3);
    }

    #[test]
    fn test_tap_closes_on_drop() {
        let channels = IngestQueue::new(None);
        let tap = channels.taps.open();
        drop(tap);

        assert!(!channels.taps.is_open());
        channels.sender.push(sample(0));
        assert_eq!(channels.receiver.drain_all().len(), 1);
    }

    #[test]
    fn test_replaced_tap_stays_open_when_old_tap_drops() {
        let channels = IngestQueue::new(None);
        let first = channels.taps.open();
        let second = channels.taps.open();
        drop(first);

        assert!(channels.taps.is_open());
        channels.sender.push(sample(7));
        assert_eq!(
            second
                .fetch(Duration::from_millis(10))
                .map(|s| s.timestamp_ns()),
            Some(7)
        );
    }

    #[test]
    fn test_producer_thread_handoff() {
        let channels = IngestQueue::new(None);
        let sender = channels.sender.clone();

        let producer = std::thread::spawn(move || {
            for ts in 0..100 {
                sender.push(sample(ts));
            }
        });
        producer.join().unwrap();

        let drained = channels.receiver.drain_all();
        assert_eq!(drained.len(), 100);
        assert!(drained
            .windows(2)
            .all(|pair| pair[0].timestamp_ns() < pair[1].timestamp_ns()));
    }

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SampleSender>();
        assert_send::<SampleReceiver>();
        assert_send::<SampleTap>();
    }
}
