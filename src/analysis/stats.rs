//! Pipeline counters shared between the recognition worker and observers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters, updated with relaxed atomics from the worker thread
#[derive(Debug, Default)]
pub struct PipelineStats {
    samples_ingested: AtomicU64,
    samples_rejected: AtomicU64,
    cycles: AtomicU64,
    dispatched: AtomicU64,
    dropped_by_cooldown: AtomicU64,
    dispatch_failures: AtomicU64,
}

/// Point-in-time copy of [PipelineStats]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_ingested: u64,
    pub samples_rejected: u64,
    pub cycles: u64,
    pub dispatched: u64,
    pub dropped_by_cooldown: u64,
    pub dispatch_failures: u64,
}

impl PipelineStats {
    pub fn record_sample(&self) {
        self.samples_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_sample(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cooldown_drop(&self) {
        self.dropped_by_cooldown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped_by_cooldown: self.dropped_by_cooldown.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}
